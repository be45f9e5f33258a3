//! Buyer–seller messaging

pub mod store;

pub use store::ConversationStore;
