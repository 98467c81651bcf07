//! Checkout steps.

use std::fmt;

/// A checkout step, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CheckoutStep {
    #[default]
    Contact,
    Address,
    Payment,
    Review,
}

impl CheckoutStep {
    /// Every step, first to last.
    pub const ALL: [Self; 4] = [Self::Contact, Self::Address, Self::Payment, Self::Review];

    /// The step after this one. `None` at Review.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Contact => Some(Self::Address),
            Self::Address => Some(Self::Payment),
            Self::Payment => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// The step before this one. `None` at Contact.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Contact => None,
            Self::Address => Some(Self::Contact),
            Self::Payment => Some(Self::Address),
            Self::Review => Some(Self::Payment),
        }
    }

    /// 1-based position, for "step 2 of 4" displays.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Contact => 1,
            Self::Address => 2,
            Self::Payment => 3,
            Self::Review => 4,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Contact => "Dados Pessoais",
            Self::Address => "Endereço",
            Self::Payment => "Pagamento",
            Self::Review => "Revisão",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Contact => "contact",
            Self::Address => "address",
            Self::Payment => "payment",
            Self::Review => "review",
        })
    }
}
