//! Shared types for the Nengoo marketplace core
//!
//! Wire and domain types used by both the server and any client:
//! the order state machine, conversation/message records, notification
//! records, shipping settings and request payloads.

pub mod conversation;
pub mod notification;
pub mod order;
pub mod settings;
pub mod types;

// Re-exports
pub use conversation::{Conversation, Message, SendMessageRequest, SenderRole};
pub use notification::{Notification, UnreadCount};
pub use order::{
    CartLine, CheckoutRequest, DeliverySelection, Order, OrderLine, OrderStatus,
    TransitionRequest,
};
pub use settings::ShippingSettings;
pub use types::{UserRef, UserType};
