//! Notification Dispatcher
//!
//! Side effect only: persists exactly one record per call. No batching
//! and no deduplication - the emitting operation owns idempotency,
//! which is why `notify` takes the caller's write transaction: the
//! record commits or aborts together with the mutation that caused it.

use crate::storage::{MarketStorage, StorageResult};
use chrono::Utc;
use redb::WriteTransaction;
use shared::{Notification, UserRef};

/// Emits notification records for order transitions and message posts
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    storage: MarketStorage,
}

impl NotificationDispatcher {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Persist one notification to `recipient` inside `txn`
    pub fn notify(
        &self,
        txn: &WriteTransaction,
        recipient: &UserRef,
        title: impl Into<String>,
        body: impl Into<String>,
        link: Option<String>,
    ) -> StorageResult<Notification> {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: recipient.user_id.clone(),
            user_type: recipient.user_type,
            title: title.into(),
            body: body.into(),
            link,
            read: false,
            created_at: Utc::now(),
        };

        self.storage
            .put_notification(txn, &recipient.storage_key(), &notification)?;

        tracing::debug!(
            recipient = %recipient.storage_key(),
            title = %notification.title,
            "Notification recorded"
        );
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::UserType;

    #[test]
    fn notify_persists_one_unread_record() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let dispatcher = NotificationDispatcher::new(storage.clone());
        let buyer = UserRef::new("b-1", UserType::Buyer);

        let txn = storage.begin_write().unwrap();
        dispatcher
            .notify(&txn, &buyer, "Titre", "Corps", Some("/orders/o-1".into()))
            .unwrap();
        txn.commit().unwrap();

        let list = storage.list_notifications("buyer:b-1").unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].read);
        assert_eq!(list[0].link.as_deref(), Some("/orders/o-1"));
    }

    #[test]
    fn notify_rides_the_caller_transaction() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let dispatcher = NotificationDispatcher::new(storage.clone());
        let buyer = UserRef::new("b-1", UserType::Buyer);

        let txn = storage.begin_write().unwrap();
        dispatcher.notify(&txn, &buyer, "T", "B", None).unwrap();
        drop(txn); // caller's operation failed - abort

        assert!(storage.list_notifications("buyer:b-1").unwrap().is_empty());
    }
}
