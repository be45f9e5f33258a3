//! Settings API Handlers

use axum::{Json, extract::State};
use shared::ShippingSettings;

use crate::api::Identity;
use crate::common::{AppError, AppResult};
use crate::core::ServerState;

/// Current shipping configuration
pub async fn get_shipping(
    State(state): State<ServerState>,
    _identity: Identity,
) -> AppResult<Json<ShippingSettings>> {
    let settings = state.storage.get_shipping_settings()?.unwrap_or_default();
    Ok(Json(settings))
}

/// Replace the shipping configuration (admin only)
pub async fn update_shipping(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<ShippingSettings>,
) -> AppResult<Json<ShippingSettings>> {
    if !identity.user.user_type.is_admin() {
        return Err(AppError::permission_denied(
            "Only administrators can change shipping settings",
        ));
    }
    if payload.standard_shipping_cost < 0 || payload.free_shipping_threshold < 0 {
        return Err(AppError::validation(
            "Shipping amounts must not be negative",
        ));
    }
    state.storage.put_shipping_settings(&payload)?;
    Ok(Json(payload))
}
