//! Buyer–seller conversation threads
//!
//! A thread is scoped to exactly one `(buyer, seller, product)` triple;
//! two distinct products between the same pair are two distinct
//! conversations. Threads are created lazily on first message and never
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the thread authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Buyer,
    Seller,
}

impl SenderRole {
    pub fn other(&self) -> SenderRole {
        match self {
            SenderRole::Buyer => SenderRole::Seller,
            SenderRole::Seller => SenderRole::Buyer,
        }
    }
}

/// A conversation thread with per-side unread flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub product_id: String,
    /// Unseen messages for the buyer side.
    pub buyer_unread: bool,
    /// Unseen messages for the seller side.
    pub seller_unread: bool,
    pub last_message_preview: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A single immutable message
///
/// Ordering is by timestamp with `seq` (per-conversation insertion
/// sequence) breaking ties deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_role: SenderRole,
    pub sender_id: String,
    pub body: String,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

/// `POST /api/messages` body
///
/// Field names match the original storefront client (`receiver_id`,
/// `message`, `product_id`); sender identity travels in headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub message: String,
    pub product_id: String,
    /// Optional idempotency token, same semantics as order transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_role_other_side() {
        assert_eq!(SenderRole::Buyer.other(), SenderRole::Seller);
        assert_eq!(SenderRole::Seller.other(), SenderRole::Buyer);
    }
}
