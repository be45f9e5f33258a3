//! Order API Module
//!
//! Checkout and status transitions. All mutations go through OrderManager.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Checkout and role-scoped listing
        .route("/", get(handler::list).post(handler::checkout))
        // Order detail and status transition
        .route("/{id}", get(handler::get_by_id).put(handler::transition))
}
