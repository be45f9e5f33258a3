//! Settings API Module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Settings router
pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/settings/shipping",
        get(handler::get_shipping).put(handler::update_shipping),
    )
}
