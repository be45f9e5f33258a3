//! Order total computation
//!
//! All amounts are integer XAF. The shipping tier is driven by the
//! shared [`ShippingSettings`], not by constants, because an
//! administrator may change the values at runtime.

use crate::common::{AppError, AppResult};
use shared::{CartLine, DeliverySelection, ShippingSettings};

/// Computed order totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total: i64,
}

/// Compute `{subtotal, shipping_cost, total}` for a cart
///
/// - Subtotal sums the *effective* unit price (promo honoured only when
///   strictly between zero and the list price) times quantity.
/// - Pickup always ships free, regardless of subtotal.
/// - Home delivery ships free only when the subtotal is strictly above
///   the free-shipping threshold; a subtotal exactly at the threshold
///   is still charged.
/// - No tax line.
///
/// # Errors
///
/// `EmptyCart` for an empty line list, `InvalidQuantity` for any line
/// with a zero quantity, `Validation` for a negative unit price or a
/// cart whose total does not fit in `i64`.
pub fn compute_totals(
    lines: &[CartLine],
    delivery: &DeliverySelection,
    settings: &ShippingSettings,
) -> AppResult<Totals> {
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut subtotal: i64 = 0;
    for line in lines {
        if line.quantity == 0 {
            return Err(AppError::invalid_quantity(format!(
                "Quantity must be at least 1 for product {}",
                line.product_id
            )));
        }
        if line.unit_price < 0 {
            return Err(AppError::validation(format!(
                "Price must not be negative for product {}",
                line.product_id
            )));
        }
        // Prices come from the client; overflow is a rejected input,
        // not a wrapped subtotal.
        let line_total = line
            .effective_unit_price()
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Line total overflows for product {}",
                    line.product_id
                ))
            })?;
        subtotal = subtotal.checked_add(line_total).ok_or_else(|| {
            AppError::validation(format!(
                "Cart total overflows at product {}",
                line.product_id
            ))
        })?;
    }

    let shipping_cost = match delivery {
        DeliverySelection::Pickup { .. } => 0,
        DeliverySelection::Home { .. } => {
            if subtotal > settings.free_shipping_threshold {
                0
            } else {
                settings.standard_shipping_cost
            }
        }
    };

    let total = subtotal
        .checked_add(shipping_cost)
        .ok_or_else(|| AppError::validation("Order total overflows"))?;

    Ok(Totals {
        subtotal,
        shipping_cost,
        total,
    })
}
