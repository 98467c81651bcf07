//! Type-safe money representation using decimal arithmetic.
//!
//! The storefront sells in a single currency (Brazilian real), so `Money`
//! carries only an amount. Amounts are `rust_decimal::Decimal` values and are
//! serialized as decimal strings, which keeps cents exact across storage
//! round trips.
//!
//! Amounts never exceed [`Money::MAX`]. Parsing and decoding reject larger
//! values, and sums and products stop at the cap.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Money`] amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input string is empty.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount has fractions of a cent.
    #[error("amount must have at most 2 decimal places")]
    TooPrecise,
    /// The amount is above [`Money::MAX`].
    #[error("amount cannot exceed R$ 999.999.999.999,99")]
    TooLarge,
}

/// A non-negative amount of money in the store currency.
///
/// ## Examples
///
/// ```
/// use vitrine_core::Money;
///
/// let price = Money::parse("150,00").unwrap();
/// assert_eq!(price, Money::from_cents(15_000));
/// assert_eq!(price.times(2).to_string(), "R$ 300,00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable amount, R$ 999.999.999.999,99.
    pub const MAX: Self = Self(Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2));

    /// Currency symbol used for display.
    pub const SYMBOL: &'static str = "R$";

    /// Create an amount from a whole number of cents, capped at [`Money::MAX`].
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::capped(Decimal::new(cents, 2))
    }

    /// Create an amount from a decimal.
    ///
    /// # Errors
    ///
    /// Returns an error if the decimal is negative, has more than two
    /// decimal places, or is above [`Money::MAX`].
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(MoneyError::TooPrecise);
        }
        if amount > Self::MAX.0 {
            return Err(MoneyError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Parse an amount as typed by a person or supplied by the catalog.
    ///
    /// Accepts `29,90`, `29.90`, `1.234,56` and an optional `R$` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, negative,
    /// more precise than a cent, or above [`Money::MAX`].
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix(Self::SYMBOL).unwrap_or(trimmed).trim();
        if trimmed.is_empty() {
            return Err(MoneyError::Empty);
        }

        // Comma-decimal input uses dots as thousands separators.
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_owned()
        };

        let amount = Decimal::from_str(&normalized)
            .map_err(|_| MoneyError::Invalid(trimmed.to_owned()))?;
        Self::from_decimal(amount)
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply a unit price by a quantity, stopping at [`Money::MAX`].
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map_or(Self::MAX, Self::capped)
    }

    /// Subtract, stopping at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    fn capped(amount: Decimal) -> Self {
        Self(amount.min(Self::MAX.0))
    }
}

impl Add for Money {
    type Output = Self;

    /// Stops at [`Money::MAX`].
    fn add(self, rhs: Self) -> Self::Output {
        self.0.checked_add(rhs.0).map_or(Self::MAX, Self::capped)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Renders the pt-BR form, e.g. `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = format!("{:.2}", self.0.round_dp(2));
        let (sign, plain) = plain
            .strip_prefix('-')
            .map_or(("", plain.as_str()), |rest| ("-", rest));
        let (whole, cents) = plain.split_once('.').unwrap_or((plain, "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        write!(f, "{} {sign}{grouped},{cents}", Self::SYMBOL)
    }
}
