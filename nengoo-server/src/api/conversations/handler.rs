//! Conversation API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::{Conversation, Message};

use crate::api::Identity;
use crate::common::AppResult;
use crate::core::ServerState;

/// List the caller's conversations, most recently active first
pub async fn list(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<Vec<Conversation>>> {
    let conversations = state.conversations.list_conversations(&identity.user)?;
    Ok(Json(conversations))
}

/// Message history for one conversation
pub async fn list_messages(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = state.conversations.list_messages(&id, &identity.user)?;
    Ok(Json(messages))
}

/// Clear the caller's unread flag on a conversation
pub async fn mark_read(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Conversation>> {
    let conversation = state.conversations.mark_read(&id, &identity.user)?;
    Ok(Json(conversation))
}
