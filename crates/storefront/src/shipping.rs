//! Shipping fee rule.

use vitrine_core::Money;

/// Flat-fee shipping that becomes free above a subtotal threshold.
///
/// The threshold is exclusive: a subtotal exactly equal to it still pays
/// the flat fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingRule {
    free_threshold: Money,
    flat_fee: Money,
}

impl ShippingRule {
    /// Free above R$ 200,00.
    pub const DEFAULT_FREE_THRESHOLD_CENTS: i64 = 20_000;
    /// R$ 29,90.
    pub const DEFAULT_FLAT_FEE_CENTS: i64 = 2_990;

    /// Create a rule.
    #[must_use]
    pub const fn new(free_threshold: Money, flat_fee: Money) -> Self {
        Self {
            free_threshold,
            flat_fee,
        }
    }

    /// Fee charged for an order with this subtotal.
    #[must_use]
    pub fn fee(&self, subtotal: Money) -> Money {
        if subtotal > self.free_threshold {
            Money::ZERO
        } else {
            self.flat_fee
        }
    }

    /// How much more must be added before shipping becomes free.
    ///
    /// Because the threshold is exclusive, a subtotal sitting exactly on it
    /// still reports one cent remaining.
    #[must_use]
    pub fn remaining_for_free_shipping(&self, subtotal: Money) -> Money {
        if subtotal > self.free_threshold {
            Money::ZERO
        } else {
            (self.free_threshold + Money::from_cents(1)).saturating_sub(subtotal)
        }
    }

    /// The subtotal that must be exceeded for free shipping.
    #[must_use]
    pub const fn free_threshold(&self) -> Money {
        self.free_threshold
    }

    /// The fee charged at or below the threshold.
    #[must_use]
    pub const fn flat_fee(&self) -> Money {
        self.flat_fee
    }
}

impl Default for ShippingRule {
    fn default() -> Self {
        Self::new(
            Money::from_cents(Self::DEFAULT_FREE_THRESHOLD_CENTS),
            Money::from_cents(Self::DEFAULT_FLAT_FEE_CENTS),
        )
    }
}
