//! ConversationStore - threads, messages and unread flags
//!
//! A thread is keyed by `(buyer_id, seller_id, product_id)` and found
//! or created regardless of which side sends first. Appending a
//! message, updating the thread summary, flipping the recipient's
//! unread flag and recording the recipient's notification all happen in
//! one write transaction, so a racing append can never lose an update
//! or half-apply.

use crate::common::{AppError, AppResult};
use crate::notifications::NotificationDispatcher;
use crate::storage::{MarketStorage, StorageError};
use chrono::Utc;
use shared::{
    Conversation, Message, SendMessageRequest, SenderRole, UserRef, UserType,
};

/// Maximum characters kept in `last_message_preview`.
const PREVIEW_CHARS: usize = 80;

/// Messaging service
#[derive(Debug, Clone)]
pub struct ConversationStore {
    storage: MarketStorage,
    dispatcher: NotificationDispatcher,
}

impl ConversationStore {
    pub fn new(storage: MarketStorage, dispatcher: NotificationDispatcher) -> Self {
        Self {
            storage,
            dispatcher,
        }
    }

    /// Append a message from `sender` about `product_id`
    ///
    /// The sender must be a buyer or a seller; the receiver is the other
    /// side. Sets only the recipient's unread flag and emits one
    /// notification to the recipient.
    pub fn post_message(&self, sender: &UserRef, request: SendMessageRequest) -> AppResult<Message> {
        let sender_role = match sender.user_type {
            UserType::Buyer => SenderRole::Buyer,
            UserType::Seller => SenderRole::Seller,
            UserType::Admin | UserType::SuperAdmin => {
                return Err(AppError::permission_denied(
                    "Only buyers and sellers may exchange messages",
                ));
            }
        };
        let body = request.message.trim().to_string();
        if body.is_empty() {
            return Err(AppError::validation("Message body must not be empty"));
        }

        // Orient the triple regardless of sending side.
        let (buyer_id, seller_id) = match sender_role {
            SenderRole::Buyer => (sender.user_id.as_str(), request.receiver_id.as_str()),
            SenderRole::Seller => (request.receiver_id.as_str(), sender.user_id.as_str()),
        };

        let txn = self.storage.begin_write()?;

        // Replayed token: return the message the original attempt
        // stored. Only the original sender may replay it; a token that
        // belongs to someone else, or that another operation recorded,
        // answers as unknown.
        if let Some(cid) = request.command_id.as_deref()
            && let Some(payload) = self.storage.get_processed_command(&txn, cid)?
        {
            let message: Message = match serde_json::from_slice(&payload) {
                Ok(m) => m,
                Err(_) => return Err(AppError::not_found(format!("Command {cid} not found"))),
            };
            if message.sender_id != sender.user_id || message.sender_role != sender_role {
                return Err(AppError::not_found(format!("Command {cid} not found")));
            }
            tracing::info!(command_id = cid, "Message replay acknowledged");
            return Ok(message);
        }

        let now = Utc::now();
        let mut conversation = match self
            .storage
            .find_conversation_id(&txn, buyer_id, seller_id, &request.product_id)?
        {
            Some(id) => self
                .storage
                .get_conversation_txn(&txn, &id)?
                .ok_or_else(|| AppError::internal(format!("Dangling thread index for {id}")))?,
            None => {
                let conversation = Conversation {
                    id: uuid::Uuid::new_v4().to_string(),
                    buyer_id: buyer_id.to_string(),
                    seller_id: seller_id.to_string(),
                    product_id: request.product_id.clone(),
                    buyer_unread: false,
                    seller_unread: false,
                    last_message_preview: String::new(),
                    last_message_at: now,
                    created_at: now,
                };
                self.storage.index_conversation(
                    &txn,
                    buyer_id,
                    seller_id,
                    &request.product_id,
                    &conversation.id,
                )?;
                conversation
            }
        };

        let seq = self.storage.next_message_seq(&txn, &conversation.id)?;
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_role,
            sender_id: sender.user_id.clone(),
            body: body.clone(),
            seq,
            created_at: now,
        };
        self.storage.append_message(&txn, &message)?;

        conversation.last_message_preview = truncate_preview(&body);
        conversation.last_message_at = now;
        // Only the recipient's flag flips; the sender's side is untouched.
        match sender_role {
            SenderRole::Buyer => conversation.seller_unread = true,
            SenderRole::Seller => conversation.buyer_unread = true,
        }
        self.storage.put_conversation(&txn, &conversation)?;

        let recipient = match sender_role {
            SenderRole::Buyer => UserRef::new(seller_id, UserType::Seller),
            SenderRole::Seller => UserRef::new(buyer_id, UserType::Buyer),
        };
        self.dispatcher.notify(
            &txn,
            &recipient,
            "Nouveau message",
            conversation.last_message_preview.clone(),
            Some("/messages".to_string()),
        )?;

        if let Some(cid) = request.command_id.as_deref() {
            let payload = serde_json::to_vec(&message).map_err(StorageError::from)?;
            self.storage.mark_command_processed(&txn, cid, &payload)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            conversation_id = %message.conversation_id,
            sender = %sender.storage_key(),
            seq,
            "Message posted"
        );
        Ok(message)
    }

    /// All threads where `user` participates, latest activity first
    pub fn list_conversations(&self, user: &UserRef) -> AppResult<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .storage
            .list_conversations()?
            .into_iter()
            .filter(|c| is_participant(c, user))
            .collect();

        conversations.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(conversations)
    }

    /// Full ordered message sequence of one thread, participant-scoped
    pub fn list_messages(&self, conversation_id: &str, user: &UserRef) -> AppResult<Vec<Message>> {
        let conversation = self.load_scoped(conversation_id, user)?;
        Ok(self.storage.list_messages(&conversation.id)?)
    }

    /// Clear the caller's own unread flag, and only theirs
    pub fn mark_read(&self, conversation_id: &str, user: &UserRef) -> AppResult<Conversation> {
        let txn = self.storage.begin_write()?;
        let mut conversation = self
            .storage
            .get_conversation_txn(&txn, conversation_id)?
            .filter(|c| is_participant(c, user))
            .ok_or_else(|| {
                AppError::not_found(format!("Conversation {conversation_id} not found"))
            })?;

        match user.user_type {
            UserType::Buyer => conversation.buyer_unread = false,
            UserType::Seller => conversation.seller_unread = false,
            // Admins are never participants; the scope filter above rejected them.
            UserType::Admin | UserType::SuperAdmin => unreachable!("non-participant passed scope"),
        }
        self.storage.put_conversation(&txn, &conversation)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(conversation)
    }

    fn load_scoped(&self, conversation_id: &str, user: &UserRef) -> AppResult<Conversation> {
        self.storage
            .get_conversation(conversation_id)?
            .filter(|c| is_participant(c, user))
            .ok_or_else(|| {
                AppError::not_found(format!("Conversation {conversation_id} not found"))
            })
    }

}

fn is_participant(conversation: &Conversation, user: &UserRef) -> bool {
    match user.user_type {
        UserType::Buyer => conversation.buyer_id == user.user_id,
        UserType::Seller => conversation.seller_id == user.user_id,
        UserType::Admin | UserType::SuperAdmin => false,
    }
}

/// Truncate to [`PREVIEW_CHARS`] characters on a char boundary.
fn truncate_preview(body: &str) -> String {
    if body.chars().count() <= PREVIEW_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    }
}
