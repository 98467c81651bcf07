//! Order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitrine_core::{Email, Money, OrderId, OrderStatus, PaymentMethod, ZipCode};

use crate::cart::CartLineItem;

/// Who placed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: Email,
    pub phone: String,
}

/// Where the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub zip_code: ZipCode,
    #[serde(rename = "address")]
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// How the order is paid. Card details are never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub total: Money,
}

/// One entry of an order's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

/// A placed order.
///
/// Items are a snapshot of the cart at submission and never change. The
/// only later changes are status transitions made through the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub customer: Customer,
    pub address: ShippingAddress,
    pub payment: Payment,
    pub status: OrderStatus,
    pub items: Vec<CartLineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<String>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl Order {
    /// When the order reached a terminal status, if it has.
    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        if !self.status.is_terminal() {
            return None;
        }
        self.history
            .iter()
            .rev()
            .find(|change| change.status == self.status)
            .map(|change| change.at)
    }

    /// Total units ordered.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    pub(crate) fn record_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.history.push(StatusChange { status, at });
    }
}
