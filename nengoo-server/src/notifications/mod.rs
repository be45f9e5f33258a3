//! Notification delivery and read-state tracking
//!
//! The dispatcher persists one record per logical event inside the
//! caller's transaction; the tracker exposes the unread-count /
//! mark-read surface that the polling clients consume.

pub mod dispatcher;
pub mod tracker;

pub use dispatcher::NotificationDispatcher;
pub use tracker::ReadTracker;
