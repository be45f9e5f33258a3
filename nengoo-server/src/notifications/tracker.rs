//! Unread/Read Tracker
//!
//! The read-state surface behind the polling badge and the notification
//! list. Counts are recomputed from storage on every call - there is no
//! cached counter that could drift when a client skips a poll.
//!
//! Ownership rule: `mark_read` and `delete` resolve the record through
//! a key that embeds the recipient, so a foreign or missing id behaves
//! identically (`PermissionDenied`) and never leaks whether another
//! user's notification exists.

use crate::common::{AppError, AppResult};
use crate::storage::MarketStorage;
use shared::{Notification, UserRef};

/// Read-state operations over a user's notifications
#[derive(Debug, Clone)]
pub struct ReadTracker {
    storage: MarketStorage,
}

impl ReadTracker {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// All notifications for `user`, newest first
    pub fn list(&self, user: &UserRef) -> AppResult<Vec<Notification>> {
        Ok(self.storage.list_notifications(&user.storage_key())?)
    }

    /// Badge count: unread notifications for `user`, recomputed on demand
    pub fn unread_count(&self, user: &UserRef) -> AppResult<u64> {
        let list = self.storage.list_notifications(&user.storage_key())?;
        Ok(list.iter().filter(|n| !n.read).count() as u64)
    }

    /// Flip one notification to read; recipient-only
    pub fn mark_read(&self, notification_id: &str, user: &UserRef) -> AppResult<Notification> {
        let recipient_key = user.storage_key();
        let txn = self.storage.begin_write()?;
        let mut notification = self
            .storage
            .get_notification_txn(&txn, &recipient_key, notification_id)?
            .ok_or_else(|| {
                AppError::permission_denied("Notification does not belong to caller")
            })?;

        if !notification.read {
            notification.read = true;
            self.storage
                .put_notification(&txn, &recipient_key, &notification)?;
        }
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(notification)
    }

    /// Flip every notification of `user` to read
    pub fn mark_all_read(&self, user: &UserRef) -> AppResult<u64> {
        let recipient_key = user.storage_key();
        let txn = self.storage.begin_write()?;

        let mut updated = 0u64;
        let ids = self.storage.notification_ids(&txn, &recipient_key)?;
        for id in ids {
            if let Some(mut n) =
                self.storage
                    .get_notification_txn(&txn, &recipient_key, &id)?
                && !n.read
            {
                n.read = true;
                self.storage.put_notification(&txn, &recipient_key, &n)?;
                updated += 1;
            }
        }
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(updated)
    }

    /// Delete one notification; recipient-only
    pub fn delete(&self, notification_id: &str, user: &UserRef) -> AppResult<()> {
        let recipient_key = user.storage_key();
        let txn = self.storage.begin_write()?;
        let removed = self
            .storage
            .remove_notification(&txn, &recipient_key, notification_id)?;
        if !removed {
            // Abort; nothing was touched.
            return Err(AppError::permission_denied(
                "Notification does not belong to caller",
            ));
        }
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(())
    }
}
