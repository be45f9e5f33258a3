//! Message API Handlers

use axum::{Json, extract::State, http::StatusCode};
use shared::{Message, SendMessageRequest};

use crate::api::Identity;
use crate::common::AppResult;
use crate::core::ServerState;

/// Send a message about a product, creating the conversation if needed
pub async fn send(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = state.conversations.post_message(&identity.user, payload)?;
    Ok((StatusCode::CREATED, Json(message)))
}
