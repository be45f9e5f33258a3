//! Order aggregate and lifecycle state machine

pub mod manager;

pub use manager::OrderManager;
