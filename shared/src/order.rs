//! Order types and the lifecycle state machine
//!
//! An order is single-seller: a multi-seller cart is not split here
//! (the checkout contract takes exactly one `seller_id`). Line items
//! are immutable snapshots taken at checkout time, so later catalog
//! price changes never affect a placed order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// ```text
/// pending → processing → shipped → delivered
///    └──────────┴─→ cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order. Used by closure tests and UIs.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Whether `to` is a legal next status from `self`.
    ///
    /// The transition table is closed: everything not listed here is
    /// illegal, including any move out of a terminal state and
    /// self-transitions.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Wire form (lowercase), matching the JSON representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Human-readable label shown to buyers (the storefront is French).
    pub fn label_fr(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "En attente",
            OrderStatus::Processing => "En traitement",
            OrderStatus::Shipped => "Expédiée",
            OrderStatus::Delivered => "Livrée",
            OrderStatus::Cancelled => "Annulée",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery mode chosen at checkout
///
/// Exactly one variant is populated. `Pickup` always ships free;
/// `Home` shipping cost is a tiered function of the subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DeliverySelection {
    Home {
        address: String,
        city: String,
        region: String,
    },
    Pickup {
        pickup_point_id: String,
    },
}

impl DeliverySelection {
    pub fn is_pickup(&self) -> bool {
        matches!(self, DeliverySelection::Pickup { .. })
    }
}

/// A cart line as submitted at checkout
///
/// Prices are whatever the caller read from the catalog at submit time;
/// no snapshot is taken at add-to-cart time. Amounts are integer XAF
/// (the currency has no subunit).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    /// Catalog list price per unit.
    pub unit_price: i64,
    /// Promotional price; only honoured when `0 < promo < unit_price`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_price: Option<i64>,
    pub quantity: u32,
}

impl CartLine {
    /// The per-unit price the buyer actually pays.
    pub fn effective_unit_price(&self) -> i64 {
        match self.promo_price {
            Some(p) if p > 0 && p < self.unit_price => p,
            _ => self.unit_price,
        }
    }
}

/// Immutable line snapshot stored on a placed order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    /// Effective unit price at checkout time, in XAF.
    pub unit_price: i64,
    pub quantity: u32,
}

impl OrderLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// A placed order
///
/// Mutated only through the state machine's transition operation and
/// never hard-deleted; history stays queryable by buyer, seller and
/// admin alike. `total_amount` is always `subtotal + shipping_cost`,
/// recomputed at creation and never independently mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub lines: Vec<OrderLine>,
    pub delivery: DeliverySelection,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total_amount: i64,
    pub status: OrderStatus,
    /// Intended payment method, recorded verbatim. No gateway is called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Set once at creation, immutable thereafter.
    pub ordered_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Checkout submission body (`POST /api/orders`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub seller_id: String,
    pub lines: Vec<CartLine>,
    pub delivery: DeliverySelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// Status transition body (`PUT /api/orders/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    /// Client-supplied idempotency token; a retry carrying the same
    /// token is acknowledged without re-applying the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGAL: [(OrderStatus, OrderStatus); 5] = [
        (OrderStatus::Pending, OrderStatus::Processing),
        (OrderStatus::Pending, OrderStatus::Cancelled),
        (OrderStatus::Processing, OrderStatus::Shipped),
        (OrderStatus::Processing, OrderStatus::Cancelled),
        (OrderStatus::Shipped, OrderStatus::Delivered),
    ];

    #[test]
    fn transition_table_closure() {
        // Every (from, to) pair outside the legal set must be rejected.
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let legal = LEGAL.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    legal,
                    "{from} -> {to} expected legal={legal}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for from in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must fail");
            }
        }
    }

    #[test]
    fn promo_price_only_when_strictly_cheaper() {
        let mut line = CartLine {
            product_id: "p1".into(),
            name: "Sac".into(),
            unit_price: 10_000,
            promo_price: None,
            quantity: 1,
        };
        assert_eq!(line.effective_unit_price(), 10_000);

        line.promo_price = Some(8_000);
        assert_eq!(line.effective_unit_price(), 8_000);

        // Zero, negative and not-actually-cheaper promos are ignored.
        line.promo_price = Some(0);
        assert_eq!(line.effective_unit_price(), 10_000);
        line.promo_price = Some(-5);
        assert_eq!(line.effective_unit_price(), 10_000);
        line.promo_price = Some(12_000);
        assert_eq!(line.effective_unit_price(), 10_000);
    }

    #[test]
    fn status_wire_form_is_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
        let back: OrderStatus = serde_json::from_str(r#""cancelled""#).unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn delivery_selection_is_tagged() {
        let home = DeliverySelection::Home {
            address: "12 Rue des Manguiers".into(),
            city: "Douala".into(),
            region: "Littoral".into(),
        };
        let json = serde_json::to_value(&home).unwrap();
        assert_eq!(json["mode"], "home");

        let pickup: DeliverySelection =
            serde_json::from_value(serde_json::json!({
                "mode": "pickup",
                "pickup_point_id": "pp-7"
            }))
            .unwrap();
        assert!(pickup.is_pickup());
    }
}
