//! Notification API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use shared::{Notification, UnreadCount};

use crate::api::Identity;
use crate::common::AppResult;
use crate::core::ServerState;

/// List the caller's notifications, newest first
pub async fn list(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state.notifications.list(&identity.user)?;
    Ok(Json(notifications))
}

/// Unread badge count, polled by the storefront
pub async fn unread_count(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<UnreadCount>> {
    let count = state.notifications.unread_count(&identity.user)?;
    Ok(Json(UnreadCount { count }))
}

/// Mark one notification as read
pub async fn mark_read(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<Json<Notification>> {
    let notification = state.notifications.mark_read(&id, &identity.user)?;
    Ok(Json(notification))
}

/// Result of a bulk read operation
#[derive(Debug, Serialize)]
pub struct MarkAllResult {
    pub updated: u64,
}

/// Mark every notification of the caller as read
pub async fn mark_all_read(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<MarkAllResult>> {
    let updated = state.notifications.mark_all_read(&identity.user)?;
    Ok(Json(MarkAllResult { updated }))
}

/// Delete one notification
pub async fn remove(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.notifications.delete(&id, &identity.user)?;
    Ok(StatusCode::NO_CONTENT)
}
