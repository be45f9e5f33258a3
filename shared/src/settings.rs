//! Shared shipping configuration
//!
//! Consumed (not owned) by the pricing engine; an administrator may
//! change the values at runtime, so they are persisted rather than
//! hard-coded.

use serde::{Deserialize, Serialize};

/// Shipping pricing knobs, in integer XAF
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingSettings {
    /// Flat home-delivery cost charged below the free-shipping threshold.
    pub standard_shipping_cost: i64,
    /// Subtotal strictly above this value ships free (home delivery).
    pub free_shipping_threshold: i64,
}

impl Default for ShippingSettings {
    fn default() -> Self {
        // Launch values of the storefront: 2 500 XAF flat, free above 50 000.
        Self {
            standard_shipping_cost: 2_500,
            free_shipping_threshold: 50_000,
        }
    }
}
