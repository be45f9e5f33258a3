//! redb-based storage layer
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Placed orders (never deleted) |
//! | `conversations` | `conversation_id` | `Conversation` | Threads |
//! | `conversation_keys` | `(buyer, seller, product)` | `conversation_id` | Thread find-or-create index |
//! | `messages` | `(conversation_id, seq)` | `Message` | Ordered message stream (append-only) |
//! | `notifications` | `(recipient_key, id)` | `Notification` | Per-recipient records |
//! | `processed_commands` | `command_id` | result payload | Idempotency tokens |
//! | `settings` | name | JSON | Shared shipping configuration |
//!
//! Values are JSON-serialized. redb serializes write transactions, so
//! every mutation here is a single atomic read-validate-write unit:
//! racing order transitions are re-validated against the post-commit
//! state and racing message appends each receive their own sequence
//! number.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::{Conversation, Message, Notification, Order, ShippingSettings};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Placed orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Conversation threads: key = conversation_id, value = JSON-serialized Conversation
const CONVERSATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("conversations");

/// Thread index: key = (buyer_id, seller_id, product_id), value = conversation_id
const CONVERSATION_KEYS_TABLE: TableDefinition<(&str, &str, &str), &str> =
    TableDefinition::new("conversation_keys");

/// Messages: key = (conversation_id, seq), value = JSON-serialized Message
const MESSAGES_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("messages");

/// Notifications: key = (recipient storage key, notification_id), value = JSON
const NOTIFICATIONS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("notifications");

/// Processed idempotency tokens: key = command_id, value = JSON result
/// payload (the entity the original attempt produced), replayed verbatim
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("processed_commands");

/// Shared configuration: key = setting name, value = JSON
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const SHIPPING_SETTINGS_KEY: &str = "shipping";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Marketplace storage backed by redb
///
/// Cheap to clone; all clones share one database handle.
#[derive(Clone)]
pub struct MarketStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for MarketStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketStorage").finish_non_exhaustive()
    }
}

impl MarketStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with immediate durability: once `commit()` returns
    /// the data survives power loss, and the file is always in a
    /// consistent state (copy-on-write with atomic pointer swap).
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init_tables(db)
    }

    /// Open an in-memory database (tests and ephemeral deployments)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(db)
    }

    fn init_tables(db: Database) -> StorageResult<Self> {
        // Create all tables up front so later read transactions never
        // race a missing table.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CONVERSATIONS_TABLE)?;
            let _ = write_txn.open_table(CONVERSATION_KEYS_TABLE)?;
            let _ = write_txn.open_table(MESSAGES_TABLE)?;
            let _ = write_txn.open_table(NOTIFICATIONS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (serialized by redb)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Operations ==========

    /// Insert or replace an order (within transaction)
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by id (within transaction, sees uncommitted writes)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by id (read-only)
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get all orders
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    // ========== Conversation Operations ==========

    /// Insert or replace a conversation (within transaction)
    pub fn put_conversation(
        &self,
        txn: &WriteTransaction,
        conversation: &Conversation,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CONVERSATIONS_TABLE)?;
        let value = serde_json::to_vec(conversation)?;
        table.insert(conversation.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a conversation by id (within transaction)
    pub fn get_conversation_txn(
        &self,
        txn: &WriteTransaction,
        conversation_id: &str,
    ) -> StorageResult<Option<Conversation>> {
        let table = txn.open_table(CONVERSATIONS_TABLE)?;
        match table.get(conversation_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a conversation by id (read-only)
    pub fn get_conversation(&self, conversation_id: &str) -> StorageResult<Option<Conversation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONVERSATIONS_TABLE)?;
        match table.get(conversation_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Look up the thread id for a (buyer, seller, product) triple
    pub fn find_conversation_id(
        &self,
        txn: &WriteTransaction,
        buyer_id: &str,
        seller_id: &str,
        product_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(CONVERSATION_KEYS_TABLE)?;
        match table.get((buyer_id, seller_id, product_id))? {
            Some(guard) => Ok(Some(guard.value().to_string())),
            None => Ok(None),
        }
    }

    /// Register a newly created thread in the find-or-create index
    pub fn index_conversation(
        &self,
        txn: &WriteTransaction,
        buyer_id: &str,
        seller_id: &str,
        product_id: &str,
        conversation_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CONVERSATION_KEYS_TABLE)?;
        table.insert((buyer_id, seller_id, product_id), conversation_id)?;
        Ok(())
    }

    /// Get all conversations
    pub fn list_conversations(&self) -> StorageResult<Vec<Conversation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONVERSATIONS_TABLE)?;

        let mut conversations = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            conversations.push(serde_json::from_slice(value.value())?);
        }
        Ok(conversations)
    }

    // ========== Message Operations ==========

    /// Next message sequence for a conversation (within transaction)
    ///
    /// Sequences start at 1 and are dense per conversation; they are the
    /// deterministic tiebreak when two messages share a timestamp.
    pub fn next_message_seq(
        &self,
        txn: &WriteTransaction,
        conversation_id: &str,
    ) -> StorageResult<u64> {
        let table = txn.open_table(MESSAGES_TABLE)?;
        let range_start = (conversation_id, 0u64);
        let range_end = (conversation_id, u64::MAX);
        let last = table
            .range(range_start..=range_end)?
            .next_back()
            .transpose()?
            .map(|(key, _value)| key.value().1)
            .unwrap_or(0);
        Ok(last + 1)
    }

    /// Append a message (within transaction)
    pub fn append_message(&self, txn: &WriteTransaction, message: &Message) -> StorageResult<()> {
        let mut table = txn.open_table(MESSAGES_TABLE)?;
        let key = (message.conversation_id.as_str(), message.seq);
        let value = serde_json::to_vec(message)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get the full ordered message sequence for a conversation
    pub fn list_messages(&self, conversation_id: &str) -> StorageResult<Vec<Message>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGES_TABLE)?;

        let mut messages: Vec<Message> = Vec::new();
        let range_start = (conversation_id, 0u64);
        let range_end = (conversation_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            messages.push(serde_json::from_slice(value.value())?);
        }

        // Key order is already (conversation, seq); re-sort by timestamp
        // with seq as tiebreak to honour the documented ordering.
        messages.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        Ok(messages)
    }

    // ========== Notification Operations ==========

    /// Insert a notification (within transaction)
    pub fn put_notification(
        &self,
        txn: &WriteTransaction,
        recipient_key: &str,
        notification: &Notification,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
        let key = (recipient_key, notification.id.as_str());
        let value = serde_json::to_vec(notification)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get one notification owned by the given recipient (within transaction)
    ///
    /// The key embeds the recipient, so a foreign notification id simply
    /// does not resolve - ownership is structural, not checked after the
    /// fact.
    pub fn get_notification_txn(
        &self,
        txn: &WriteTransaction,
        recipient_key: &str,
        notification_id: &str,
    ) -> StorageResult<Option<Notification>> {
        let table = txn.open_table(NOTIFICATIONS_TABLE)?;
        match table.get((recipient_key, notification_id))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Remove one notification owned by the given recipient (within transaction)
    ///
    /// Returns whether a record was actually removed.
    pub fn remove_notification(
        &self,
        txn: &WriteTransaction,
        recipient_key: &str,
        notification_id: &str,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
        Ok(table.remove((recipient_key, notification_id))?.is_some())
    }

    /// All notifications for one recipient, newest first
    pub fn list_notifications(&self, recipient_key: &str) -> StorageResult<Vec<Notification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS_TABLE)?;

        let mut notifications: Vec<Notification> = Vec::new();
        for result in table.range((recipient_key, "")..)? {
            let (key, value) = result?;
            if key.value().0 != recipient_key {
                break;
            }
            notifications.push(serde_json::from_slice(value.value())?);
        }

        notifications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(notifications)
    }

    /// Notification ids for one recipient (within transaction)
    pub fn notification_ids(
        &self,
        txn: &WriteTransaction,
        recipient_key: &str,
    ) -> StorageResult<Vec<String>> {
        let table = txn.open_table(NOTIFICATIONS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.range((recipient_key, "")..)? {
            let (key, _value) = result?;
            if key.value().0 != recipient_key {
                break;
            }
            ids.push(key.value().1.to_string());
        }
        Ok(ids)
    }

    // ========== Command Idempotency ==========

    /// Result payload recorded for an applied token (within transaction)
    pub fn get_processed_command(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.map(|guard| guard.value().to_vec()))
    }

    /// Record an idempotency token with its result payload (within transaction)
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
        payload: &[u8],
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, payload)?;
        Ok(())
    }

    // ========== Shared Configuration ==========

    /// Current shipping settings, if ever written
    pub fn get_shipping_settings(&self) -> StorageResult<Option<ShippingSettings>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        match table.get(SHIPPING_SETTINGS_KEY)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Replace the shipping settings
    pub fn put_shipping_settings(&self, settings: &ShippingSettings) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            let value = serde_json::to_vec(settings)?;
            table.insert(SHIPPING_SETTINGS_KEY, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Write the given settings only if none are stored yet
    pub fn seed_shipping_settings(&self, defaults: &ShippingSettings) -> StorageResult<()> {
        if self.get_shipping_settings()?.is_none() {
            self.put_shipping_settings(defaults)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::SenderRole;

    fn make_message(conv: &str, seq: u64, body: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conv.to_string(),
            sender_role: SenderRole::Buyer,
            sender_id: "b-1".to_string(),
            body: body.to_string(),
            seq,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_sequences_are_dense_per_conversation() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_message_seq(&txn, "c-1").unwrap(), 1);
        storage
            .append_message(&txn, &make_message("c-1", 1, "bonjour"))
            .unwrap();
        storage
            .append_message(&txn, &make_message("c-2", 1, "autre fil"))
            .unwrap();
        assert_eq!(storage.next_message_seq(&txn, "c-1").unwrap(), 2);
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_message_seq(&txn, "c-1").unwrap(), 2);
        assert_eq!(storage.next_message_seq(&txn, "c-2").unwrap(), 2);
        drop(txn);

        let msgs = storage.list_messages("c-1").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, "bonjour");
    }

    #[test]
    fn notification_keys_are_recipient_scoped() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let n = Notification {
            id: "n-1".to_string(),
            user_id: "b-1".to_string(),
            user_type: shared::UserType::Buyer,
            title: "t".to_string(),
            body: "b".to_string(),
            link: None,
            read: false,
            created_at: Utc::now(),
        };

        let txn = storage.begin_write().unwrap();
        storage.put_notification(&txn, "buyer:b-1", &n).unwrap();
        txn.commit().unwrap();

        // The owner sees it; a different recipient does not resolve it.
        let txn = storage.begin_write().unwrap();
        assert!(
            storage
                .get_notification_txn(&txn, "buyer:b-1", "n-1")
                .unwrap()
                .is_some()
        );
        assert!(
            storage
                .get_notification_txn(&txn, "seller:s-1", "n-1")
                .unwrap()
                .is_none()
        );
        drop(txn);

        assert_eq!(storage.list_notifications("buyer:b-1").unwrap().len(), 1);
        assert!(storage.list_notifications("buyer:b-2").unwrap().is_empty());
    }

    #[test]
    fn aborted_transaction_leaves_no_trace() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage
            .append_message(&txn, &make_message("c-9", 1, "jamais commis"))
            .unwrap();
        drop(txn); // abort

        assert!(storage.list_messages("c-9").unwrap().is_empty());
    }

    #[test]
    fn command_tokens_round_trip() {
        let storage = MarketStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        assert!(storage.get_processed_command(&txn, "cmd-1").unwrap().is_none());
        storage
            .mark_command_processed(&txn, "cmd-1", b"o-1")
            .unwrap();
        assert!(storage.get_processed_command(&txn, "cmd-1").unwrap().is_some());
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(
            storage.get_processed_command(&txn, "cmd-1").unwrap(),
            Some(b"o-1".to_vec())
        );
        drop(txn);
    }

    #[test]
    fn disk_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market.redb");

        {
            let storage = MarketStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage
                .append_message(&txn, &make_message("c-1", 1, "persisté"))
                .unwrap();
            txn.commit().unwrap();
        }

        let storage = MarketStorage::open(&path).unwrap();
        let msgs = storage.list_messages("c-1").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, "persisté");
    }

    #[test]
    fn shipping_settings_seed_does_not_overwrite() {
        let storage = MarketStorage::open_in_memory().unwrap();
        assert!(storage.get_shipping_settings().unwrap().is_none());

        let custom = ShippingSettings {
            standard_shipping_cost: 3_000,
            free_shipping_threshold: 60_000,
        };
        storage.put_shipping_settings(&custom).unwrap();
        storage
            .seed_shipping_settings(&ShippingSettings::default())
            .unwrap();

        assert_eq!(storage.get_shipping_settings().unwrap(), Some(custom));
    }
}
