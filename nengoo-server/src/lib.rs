//! Nengoo Core - order lifecycle and messaging backend for the marketplace
//!
//! # Module structure
//!
//! ```text
//! nengoo-server/src/
//! ├── core/           # Configuration, state, HTTP server
//! ├── common/         # Errors, logging
//! ├── storage/        # Embedded redb storage
//! ├── pricing/        # Cart totals and shipping tiers
//! ├── orders/         # Order state machine
//! ├── messaging/      # Buyer/seller conversations
//! ├── notifications/  # Per-user notification feed
//! └── api/            # HTTP routes and handlers
//! ```

pub mod api;
pub mod common;
pub mod core;
pub mod messaging;
pub mod notifications;
pub mod orders;
pub mod pricing;
pub mod storage;

// Re-export common entry points
pub use common::{AppError, AppResponse, AppResult};
pub use common::{init_logger, init_logger_with_file};
pub use core::{Config, Server, ServerState};
pub use messaging::ConversationStore;
pub use notifications::{NotificationDispatcher, ReadTracker};
pub use orders::OrderManager;
pub use storage::MarketStorage;
