//! Pricing Engine
//!
//! Pure order-total computation. Both the cart summary and the checkout
//! submission call into this module, so it must be deterministic for
//! identical inputs - the two views have to agree to the XAF unit.

pub mod engine;

pub use engine::{Totals, compute_totals};
