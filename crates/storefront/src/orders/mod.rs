//! Order ledger.
//!
//! The ledger is the record of every order and the only place an order's
//! status changes. Orders are created from a cart snapshot, start as
//! `confirmed`, and move only along the matrix in
//! [`OrderStatus::allowed_transitions`]. Orders are never deleted.
//!
//! Like the cart, the ledger saves the complete new order list before
//! committing it in memory, so creation and transitions are all-or-nothing.
//!
//! A save that misses the storage deadline is given one more window. If it
//! is still running after that, its outcome is unknown: the operation fails
//! with `StorageError::Timeout` and the write is kept pending. The next
//! operation waits for it first and adopts the saved list if it landed, so
//! a late order is never dropped from the record.

mod model;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use vitrine_core::{OrderId, OrderStatus, PaymentMethod};

pub use model::{Customer, Order, Payment, ShippingAddress, StatusChange};

use crate::cart::{CartLineItem, Pricing};
use crate::shipping::ShippingRule;
use crate::storage::{BoundedStorage, Namespace, PendingSave, SaveOutcome, StorageError};

/// Errors raised by the order ledger.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Tried to create an order with no items.
    #[error("cannot create an order from an empty cart")]
    EmptyOrder,

    /// No order has this ID.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The requested status is not reachable from the current one.
    #[error("order {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The ledger could not be saved.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The order ledger.
pub struct OrderLedger {
    /// Newest first.
    orders: Vec<Order>,
    rule: ShippingRule,
    storage: BoundedStorage,
    /// A save that outlived its deadline, with the list it is writing.
    pending: Option<(PendingSave, Vec<Order>)>,
}

impl OrderLedger {
    /// Create an empty ledger.
    #[must_use]
    pub const fn new(storage: BoundedStorage, rule: ShippingRule) -> Self {
        Self {
            orders: Vec::new(),
            rule,
            storage,
            pending: None,
        }
    }

    /// Restore the ledger saved in the `orders` namespace.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or decoded.
    #[instrument(skip_all)]
    pub async fn load(storage: BoundedStorage, rule: ShippingRule) -> Result<Self, StorageError> {
        let mut orders: Vec<Order> = storage.load(Namespace::Orders).await?.unwrap_or_default();
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        info!(orders = orders.len(), "Order ledger loaded");
        Ok(Self {
            orders,
            rule,
            storage,
            pending: None,
        })
    }

    /// Record a new order from a cart snapshot.
    ///
    /// The total is recomputed from `items` with the ledger's shipping rule.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyOrder` if `items` is empty (nothing is
    /// saved), or `OrderError::Storage` if the ledger cannot be saved (the
    /// order does not exist in that case).
    #[instrument(skip_all, fields(customer = %customer.email, method = %method))]
    pub async fn create(
        &mut self,
        items: Vec<CartLineItem>,
        customer: Customer,
        address: ShippingAddress,
        method: PaymentMethod,
    ) -> Result<Order, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        if self.settle().await? {
            let already_recorded = self.orders.first().filter(|order| {
                order.items == items
                    && order.customer == customer
                    && order.address == address
                    && order.payment.method == method
            });
            if let Some(order) = already_recorded {
                info!(order_id = %order.id, "Order was recorded by a late save");
                return Ok(order.clone());
            }
        }

        let now = Utc::now();
        let pricing = Pricing::for_items(&items, &self.rule);
        let mut order = Order {
            id: self.next_id(now),
            created_at: now,
            customer,
            address,
            payment: Payment {
                method,
                total: pricing.total,
            },
            status: OrderStatus::Confirmed,
            items,
            tracking: None,
            history: Vec::new(),
        };
        order.record_status(OrderStatus::Confirmed, now);

        let mut next = Vec::with_capacity(self.orders.len() + 1);
        next.push(order.clone());
        next.extend(self.orders.iter().cloned());
        self.commit(next).await?;

        info!(order_id = %order.id, total = %order.payment.total, "Order created");
        Ok(order)
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown ID,
    /// `OrderError::InvalidTransition` if `status` does not follow the
    /// current status, or `OrderError::Storage` if the ledger cannot be
    /// saved. The stored order is unchanged on every error.
    #[instrument(skip(self))]
    pub async fn transition(&mut self, id: OrderId, status: OrderStatus) -> Result<Order, OrderError> {
        self.apply(id, status, None).await
    }

    /// Mark a processing order as shipped, recording the carrier's tracking code.
    ///
    /// # Errors
    ///
    /// Same as [`OrderLedger::transition`].
    #[instrument(skip(self))]
    pub async fn ship(&mut self, id: OrderId, tracking: String) -> Result<Order, OrderError> {
        self.apply(id, OrderStatus::Shipped, Some(tracking)).await
    }

    /// Look up an order.
    #[must_use]
    pub fn find(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    /// Every order, newest first.
    #[must_use]
    pub fn list(&self) -> &[Order] {
        &self.orders
    }

    async fn apply(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        tracking: Option<String>,
    ) -> Result<Order, OrderError> {
        self.settle().await?;
        let index = self
            .orders
            .iter()
            .position(|order| order.id == id)
            .ok_or(OrderError::NotFound(id))?;

        let mut next = self.orders.clone();
        let order = next.get_mut(index).ok_or(OrderError::NotFound(id))?;
        if !order.status.can_transition_to(status) {
            return Err(OrderError::InvalidTransition {
                id,
                from: order.status,
                to: status,
            });
        }

        let from = order.status;
        order.record_status(status, Utc::now());
        if tracking.is_some() {
            order.tracking = tracking;
        }
        let updated = order.clone();

        self.commit(next).await?;
        info!(order_id = %id, %from, to = %status, "Order status changed");
        Ok(updated)
    }

    /// Millisecond timestamp, bumped past the newest existing ID if needed.
    fn next_id(&self, now: DateTime<Utc>) -> OrderId {
        let candidate = now.timestamp_millis();
        let newest = self.orders.iter().map(|order| order.id.as_i64()).max();
        OrderId::new(newest.map_or(candidate, |newest| candidate.max(newest.saturating_add(1))))
    }

    async fn commit(&mut self, next: Vec<Order>) -> Result<(), StorageError> {
        let write = self.storage.spawn_save(Namespace::Orders, &next)?;
        let write = match write.wait().await {
            SaveOutcome::Saved => {
                self.orders = next;
                return Ok(());
            }
            SaveOutcome::Failed(err) => return Err(err),
            SaveOutcome::Running(write) => write,
        };

        match write.wait().await {
            SaveOutcome::Saved => {
                warn!(orders = next.len(), "Orders saved after the storage deadline");
                self.orders = next;
                Ok(())
            }
            SaveOutcome::Failed(err) => Err(err),
            SaveOutcome::Running(write) => {
                let err = write.timeout_error();
                warn!(orders = next.len(), "Orders save still running, outcome unknown");
                self.pending = Some((write, next));
                Err(err)
            }
        }
    }

    /// Wait for a save left running by an earlier operation.
    ///
    /// Returns true if it landed and its list was adopted.
    async fn settle(&mut self) -> Result<bool, StorageError> {
        let Some((write, next)) = self.pending.take() else {
            return Ok(false);
        };
        match write.wait().await {
            SaveOutcome::Saved => {
                warn!(orders = next.len(), "Adopting orders saved after the storage deadline");
                self.orders = next;
                Ok(true)
            }
            SaveOutcome::Failed(err) => {
                debug!(error = %err, "Late orders save failed, keeping the ledger as it was");
                Ok(false)
            }
            SaveOutcome::Running(write) => {
                let err = write.timeout_error();
                self.pending = Some((write, next));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use test_case::test_case;
    use vitrine_core::{Email, Money, ProductId, ZipCode};

    use super::*;
    use crate::cart::{CatalogProduct, ItemSelection};
    use crate::storage::{MemoryStorage, Storage};

    fn ledger() -> (OrderLedger, Arc<MemoryStorage>) {
        let memory = Arc::new(MemoryStorage::new());
        let storage = BoundedStorage::new(memory.clone(), Duration::from_secs(1));
        (OrderLedger::new(storage, ShippingRule::default()), memory)
    }

    fn items(cents: i64, quantity: u32) -> Vec<CartLineItem> {
        let product = CatalogProduct {
            product_id: ProductId::new(1),
            name: "Jaqueta".to_string(),
            unit_price: Money::from_cents(cents),
            image_ref: "/img/1.jpg".to_string(),
        };
        vec![CartLineItem::new(ItemSelection::plain(product), quantity)]
    }

    fn customer() -> Customer {
        Customer {
            name: "Ana Souza".to_string(),
            email: Email::parse("ana@loja.com.br").unwrap(),
            phone: "11987654321".to_string(),
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            zip_code: ZipCode::parse("01310-100").unwrap(),
            street: "Avenida Paulista".to_string(),
            number: "1000".to_string(),
            complement: None,
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
        }
    }

    async fn placed(ledger: &mut OrderLedger) -> Order {
        ledger
            .create(items(5_000, 1), customer(), address(), PaymentMethod::Pix)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_confirms_and_prices_order() {
        let (mut ledger, _) = ledger();
        let order = placed(&mut ledger).await;

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment.total, Money::from_cents(7_990));
        assert_eq!(order.history.len(), 1);
        assert_eq!(ledger.find(order.id), Some(&order));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_snapshot() {
        let (mut ledger, memory) = ledger();
        let err = ledger
            .create(Vec::new(), customer(), address(), PaymentMethod::Boleto)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::EmptyOrder));
        assert!(ledger.list().is_empty());
        assert!(memory.document(Namespace::Orders).is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let (mut ledger, _) = ledger();
        let first = placed(&mut ledger).await;
        let second = placed(&mut ledger).await;
        let third = placed(&mut ledger).await;

        assert!(first.id < second.id);
        assert!(second.id < third.id);
        let ids: Vec<OrderId> = ledger.list().iter().map(|order| order.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[test_case(&[OrderStatus::Processing] ; "confirm to processing")]
    #[test_case(&[OrderStatus::Cancelled] ; "cancel right away")]
    #[test_case(&[OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] ; "happy path")]
    #[test_case(&[OrderStatus::Processing, OrderStatus::Cancelled] ; "cancel while processing")]
    #[tokio::test]
    async fn test_allowed_paths(path: &[OrderStatus]) {
        let (mut ledger, _) = ledger();
        let order = placed(&mut ledger).await;
        for status in path {
            let updated = ledger.transition(order.id, *status).await.unwrap();
            assert_eq!(updated.status, *status);
        }
        assert_eq!(ledger.find(order.id).unwrap().history.len(), path.len() + 1);
    }

    #[tokio::test]
    async fn test_confirmed_to_delivered_is_invalid() {
        let (mut ledger, memory) = ledger();
        let order = placed(&mut ledger).await;
        let stored_before = memory.document(Namespace::Orders);

        let err = ledger
            .transition(order.id, OrderStatus::Delivered)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Confirmed,
                to: OrderStatus::Delivered,
                ..
            }
        ));
        assert_eq!(ledger.find(order.id).unwrap().status, OrderStatus::Confirmed);
        assert_eq!(memory.document(Namespace::Orders), stored_before);
    }

    #[tokio::test]
    async fn test_terminal_orders_stay_terminal() {
        let (mut ledger, _) = ledger();
        let order = placed(&mut ledger).await;
        ledger.transition(order.id, OrderStatus::Cancelled).await.unwrap();

        for status in OrderStatus::ALL {
            assert!(ledger.transition(order.id, status).await.is_err());
        }
        assert!(ledger.find(order.id).unwrap().closed_at().is_some());
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let (mut ledger, _) = ledger();
        let err = ledger
            .transition(OrderId::new(1), OrderStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ship_records_tracking_code() {
        let (mut ledger, _) = ledger();
        let order = placed(&mut ledger).await;
        ledger.transition(order.id, OrderStatus::Processing).await.unwrap();

        let shipped = ledger.ship(order.id, "BR123456789BR".to_string()).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.tracking.as_deref(), Some("BR123456789BR"));
        assert!(shipped.closed_at().is_none());
    }

    #[tokio::test]
    async fn test_ship_requires_processing() {
        let (mut ledger, _) = ledger();
        let order = placed(&mut ledger).await;
        let err = ledger.ship(order.id, "BR1".to_string()).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert!(ledger.find(order.id).unwrap().tracking.is_none());
    }

    #[tokio::test]
    async fn test_ledger_survives_reload() {
        let (mut ledger, memory) = ledger();
        let order = placed(&mut ledger).await;
        ledger.transition(order.id, OrderStatus::Processing).await.unwrap();

        let storage = BoundedStorage::new(memory, Duration::from_secs(1));
        let reloaded = OrderLedger::load(storage, ShippingRule::default()).await.unwrap();
        assert_eq!(reloaded.list(), ledger.list());

        let stored = reloaded.find(order.id).unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
        assert_eq!(stored.payment.method, PaymentMethod::Pix);
    }

    #[tokio::test]
    async fn test_stored_shape() {
        let (mut ledger, memory) = ledger();
        placed(&mut ledger).await;

        let stored = memory.document(Namespace::Orders).unwrap();
        let first = &stored[0];
        assert_eq!(first["status"], "confirmed");
        assert_eq!(first["payment"]["method"], "pix");
        assert_eq!(first["payment"]["total"], "79.90");
        assert_eq!(first["address"]["zipCode"], "01310100");
        assert_eq!(first["address"]["address"], "Avenida Paulista");
        assert!(first.get("createdAt").is_some());
    }

    /// Saves land in `memory` after `delay`, whatever the deadline.
    struct LateSaves {
        delay: Duration,
        memory: MemoryStorage,
    }

    #[async_trait::async_trait]
    impl Storage for LateSaves {
        async fn load(&self, namespace: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
            self.memory.load(namespace).await
        }

        async fn save(&self, namespace: Namespace, value: serde_json::Value) -> Result<(), StorageError> {
            tokio::time::sleep(self.delay).await;
            self.memory.save(namespace, value).await
        }

        async fn remove(&self, namespace: Namespace) -> Result<(), StorageError> {
            self.memory.remove(namespace).await
        }
    }

    /// Ledger with a 50ms storage deadline over saves that take `delay_ms`.
    fn late_ledger(delay_ms: u64) -> (OrderLedger, Arc<LateSaves>) {
        let late = Arc::new(LateSaves {
            delay: Duration::from_millis(delay_ms),
            memory: MemoryStorage::new(),
        });
        let storage = BoundedStorage::new(late.clone(), Duration::from_millis(50));
        (OrderLedger::new(storage, ShippingRule::default()), late)
    }

    fn stored_ids(late: &LateSaves) -> Vec<i64> {
        late.memory
            .document(Namespace::Orders)
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default()
            .iter()
            .filter_map(|order| order["id"].as_i64())
            .collect()
    }

    #[tokio::test]
    async fn test_save_just_past_deadline_counts() {
        let (mut ledger, late) = late_ledger(75);

        let order = placed(&mut ledger).await;

        assert_eq!(ledger.list().len(), 1);
        assert_eq!(stored_ids(&late), vec![order.id.as_i64()]);
    }

    #[tokio::test]
    async fn test_retry_after_unknown_outcome_returns_the_landed_order() {
        let (mut ledger, late) = late_ledger(150);

        let err = ledger
            .create(items(5_000, 1), customer(), address(), PaymentMethod::Pix)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Storage(StorageError::Timeout { .. })));
        assert!(ledger.list().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let landed = stored_ids(&late);
        assert_eq!(landed.len(), 1);

        let retried = placed(&mut ledger).await;

        assert_eq!(vec![retried.id.as_i64()], landed);
        assert_eq!(ledger.list().len(), 1);
        assert_eq!(stored_ids(&late), landed);
    }

    #[tokio::test]
    async fn test_late_order_is_not_erased_by_next_change() {
        let (mut ledger, late) = late_ledger(150);
        assert!(
            ledger
                .create(items(5_000, 1), customer(), address(), PaymentMethod::Pix)
                .await
                .is_err()
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        let id = OrderId::new(stored_ids(&late).first().copied().unwrap());

        let updated = ledger.transition(id, OrderStatus::Cancelled).await;

        // The late write was adopted; the transition then needs its own save,
        // which again outlives both windows.
        assert!(matches!(updated, Err(OrderError::Storage(StorageError::Timeout { .. }))));
        assert_eq!(ledger.find(id).unwrap().status, OrderStatus::Confirmed);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(stored_ids(&late), vec![id.as_i64()]);
    }

    #[tokio::test]
    async fn test_settle_without_pending_save_changes_nothing() {
        let (mut ledger, memory) = ledger();
        placed(&mut ledger).await;
        let before = memory.document(Namespace::Orders);

        assert!(ledger.settle().await.is_ok_and(|adopted| !adopted));
        assert_eq!(memory.document(Namespace::Orders), before);
    }
}
