//! Cart totals.

use serde::{Deserialize, Serialize};
use vitrine_core::Money;

use super::CartLineItem;
use crate::shipping::ShippingRule;

/// Subtotal, shipping and total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
}

impl Pricing {
    /// Price `items` under `rule`.
    #[must_use]
    pub fn for_items(items: &[CartLineItem], rule: &ShippingRule) -> Self {
        let subtotal: Money = items.iter().map(CartLineItem::line_total).sum();
        let shipping = rule.fee(subtotal);
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

/// Immutable copy of the cart at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<CartLineItem>,
    pub pricing: Pricing,
    /// Extra spend needed for free shipping.
    pub remaining_for_free_shipping: Money,
}

impl CartSnapshot {
    pub(crate) fn capture(items: &[CartLineItem], rule: &ShippingRule) -> Self {
        let pricing = Pricing::for_items(items, rule);
        Self {
            items: items.to_vec(),
            pricing,
            remaining_for_free_shipping: rule.remaining_for_free_shipping(pricing.subtotal),
        }
    }

    /// Returns true if the cart had no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }
}
