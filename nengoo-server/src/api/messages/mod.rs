//! Message API Module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Message router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/messages", post(handler::send))
}
