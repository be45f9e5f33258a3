//! Notification records
//!
//! One record per logical event, owned exclusively by its recipient.
//! The dispatcher never batches or deduplicates; idempotency is the
//! responsibility of the emitting operation.

use crate::types::UserType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification delivered to one recipient's badge/list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub user_type: UserType,
    pub title: String,
    pub body: String,
    /// Optional deep-link into the client, e.g. `/orders/{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// `GET /api/notifications/unread-count` body
///
/// The count is recomputed on demand; there is no cached counter that
/// could drift between polls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadCount {
    pub count: u64,
}
