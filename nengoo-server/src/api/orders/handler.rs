//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::{CheckoutRequest, Order, TransitionRequest, UserType};

use crate::api::Identity;
use crate::common::{AppError, AppResult};
use crate::core::ServerState;

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
}

/// List orders visible to the caller
pub async fn list(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.orders.list(
        &identity.user,
        query.buyer_id.as_deref(),
        query.seller_id.as_deref(),
    )?;
    Ok(Json(orders))
}

/// Place an order from the caller's cart
pub async fn checkout(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    if identity.user.user_type != UserType::Buyer {
        return Err(AppError::permission_denied("Only buyers can place orders"));
    }
    let order = state.orders.checkout(&identity.user.user_id, payload)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get(&id, &identity.user)?;
    Ok(Json(order))
}

/// Advance an order to a new status
pub async fn transition(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders.transition(
        &id,
        payload.status,
        &identity.user,
        payload.command_id.as_deref(),
    )?;
    Ok(Json(order))
}
