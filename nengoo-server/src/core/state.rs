//! Server state - shared service handles
//!
//! `ServerState` holds one handle per service; cloning is cheap because
//! everything shares the same storage `Arc` underneath. All writes
//! funnel through the storage layer's serialized transactions, so the
//! state itself carries no locks.

use crate::common::AppResult;
use crate::core::Config;
use crate::messaging::ConversationStore;
use crate::notifications::{NotificationDispatcher, ReadTracker};
use crate::orders::OrderManager;
use crate::storage::MarketStorage;

/// Shared application state injected into every handler
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration (immutable after startup)
    pub config: Config,
    /// Storage handle
    pub storage: MarketStorage,
    /// Order lifecycle service
    pub orders: OrderManager,
    /// Messaging service
    pub conversations: ConversationStore,
    /// Notification read-state service
    pub notifications: ReadTracker,
}

impl ServerState {
    /// Initialize state with a disk-backed database under `work_dir`
    pub fn initialize(config: &Config) -> AppResult<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            crate::common::AppError::internal(format!(
                "Cannot create work dir {}: {e}",
                config.work_dir
            ))
        })?;
        let storage = MarketStorage::open(config.db_path())?;
        Self::with_storage(config.clone(), storage)
    }

    /// Initialize state over an in-memory database (tests)
    pub fn in_memory() -> AppResult<Self> {
        let storage = MarketStorage::open_in_memory()?;
        Self::with_storage(Config::from_env(), storage)
    }

    fn with_storage(config: Config, storage: MarketStorage) -> AppResult<Self> {
        // First boot seeds the admin-editable shipping settings.
        storage.seed_shipping_settings(&config.shipping_defaults)?;

        let dispatcher = NotificationDispatcher::new(storage.clone());
        let orders = OrderManager::new(storage.clone(), dispatcher.clone());
        let conversations = ConversationStore::new(storage.clone(), dispatcher);
        let notifications = ReadTracker::new(storage.clone());

        Ok(Self {
            config,
            storage,
            orders,
            conversations,
            notifications,
        })
    }
}
