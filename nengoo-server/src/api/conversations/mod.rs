//! Conversation API Module
//!
//! Thread listing and history. Sending goes through the messages route.

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

/// Conversation router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/conversations", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/{id}/messages", get(handler::list_messages))
        .route("/{id}/read", put(handler::mark_read))
}
