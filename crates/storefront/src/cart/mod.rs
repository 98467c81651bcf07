//! Shopping cart.
//!
//! The cart owns its lines and keeps two invariants:
//!
//! - at most one line per [`LineKey`] (product, size, color); adding an
//!   existing combination increases that line's quantity
//! - every quantity is at least 1; lower requests are clamped
//!
//! Each mutation is computed on a copy of the lines, saved to the `cart`
//! namespace, and only then committed. A failed save leaves the cart exactly
//! as it was, so callers never observe a half-applied change.

mod line;
mod pricing;

use tracing::{debug, instrument};

pub use line::{CartLineItem, CatalogProduct, ItemSelection, LineKey};
pub use pricing::{CartSnapshot, Pricing};

use crate::shipping::ShippingRule;
use crate::storage::{BoundedStorage, Namespace, StorageError};

/// The shopping cart.
pub struct CartStore {
    lines: Vec<CartLineItem>,
    rule: ShippingRule,
    storage: BoundedStorage,
}

impl CartStore {
    /// Create an empty cart. Nothing is written until the first mutation.
    #[must_use]
    pub const fn new(storage: BoundedStorage, rule: ShippingRule) -> Self {
        Self {
            lines: Vec::new(),
            rule,
            storage,
        }
    }

    /// Restore the cart saved in the `cart` namespace.
    ///
    /// Stored lines are re-consolidated: duplicate keys merge and
    /// quantities below 1 are raised to 1.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or decoded.
    #[instrument(skip_all)]
    pub async fn load(storage: BoundedStorage, rule: ShippingRule) -> Result<Self, StorageError> {
        let stored: Vec<CartLineItem> = storage.load(Namespace::Cart).await?.unwrap_or_default();
        let lines = consolidate(stored);
        debug!(lines = lines.len(), "Cart loaded");
        Ok(Self {
            lines,
            rule,
            storage,
        })
    }

    /// Current lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// The shipping rule used for totals.
    #[must_use]
    pub const fn shipping_rule(&self) -> &ShippingRule {
        &self.rule
    }

    /// Add `quantity` units of a selection.
    ///
    /// Merges into the existing line when the key matches (keeping that
    /// line's name and price); otherwise appends a new line. A `quantity`
    /// of 0 counts as 1.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the new cart cannot be saved; the cart is
    /// unchanged in that case.
    #[instrument(skip(self, selection), fields(key = %selection.key()))]
    pub async fn add_item(
        &mut self,
        selection: ItemSelection,
        quantity: u32,
    ) -> Result<CartLineItem, StorageError> {
        let quantity = quantity.max(1);
        let key = selection.key();
        let mut next = self.lines.clone();

        let line = if let Some(existing) = next.iter_mut().find(|line| line.matches(&key)) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            existing.clone()
        } else {
            let line = CartLineItem::new(selection, quantity);
            next.push(line.clone());
            line
        };

        self.commit(next).await?;
        debug!(quantity = line.quantity, "Item added to cart");
        Ok(line)
    }

    /// Set the quantity of the line identified by `key`, clamped to at least 1.
    ///
    /// Returns `None` without touching storage if no line matches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the new cart cannot be saved; the cart is
    /// unchanged in that case.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn update_quantity(
        &mut self,
        key: &LineKey,
        quantity: u32,
    ) -> Result<Option<CartLineItem>, StorageError> {
        self.modify_line(key, |_| quantity.max(1)).await
    }

    /// Add a signed `delta` to a line's quantity, stopping at 1.
    ///
    /// Returns `None` without touching storage if no line matches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the new cart cannot be saved; the cart is
    /// unchanged in that case.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn adjust_quantity(
        &mut self,
        key: &LineKey,
        delta: i64,
    ) -> Result<Option<CartLineItem>, StorageError> {
        self.modify_line(key, |current| {
            let wanted = i64::from(current).saturating_add(delta).max(1);
            u32::try_from(wanted).unwrap_or(u32::MAX)
        })
        .await
    }

    /// Remove the line identified by `key`.
    ///
    /// Removing an absent line is a no-op and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the new cart cannot be saved; the cart is
    /// unchanged in that case.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn remove_item(&mut self, key: &LineKey) -> Result<Option<CartLineItem>, StorageError> {
        let Some(index) = self.lines.iter().position(|line| line.matches(key)) else {
            return Ok(None);
        };

        let mut next = self.lines.clone();
        let removed = next.remove(index);
        self.commit(next).await?;
        debug!("Item removed from cart");
        Ok(Some(removed))
    }

    /// Copy of the lines with subtotal, shipping and total.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::capture(&self.lines, &self.rule)
    }

    /// Total units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Empty the cart. Called once an order has been durably created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the empty cart cannot be saved; the lines
    /// are kept in that case.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.commit(Vec::new()).await?;
        debug!("Cart cleared");
        Ok(())
    }

    /// Drop the in-memory lines without saving.
    ///
    /// Used after an order was created but the empty cart could not be
    /// saved: the lines must not be ordered twice.
    pub(crate) fn discard_lines(&mut self) {
        self.lines.clear();
    }

    async fn modify_line(
        &mut self,
        key: &LineKey,
        quantity_for: impl FnOnce(u32) -> u32,
    ) -> Result<Option<CartLineItem>, StorageError> {
        let Some(index) = self.lines.iter().position(|line| line.matches(key)) else {
            return Ok(None);
        };

        let mut next = self.lines.clone();
        let Some(line) = next.get_mut(index) else {
            return Ok(None);
        };
        line.quantity = quantity_for(line.quantity).max(1);
        let updated = line.clone();

        self.commit(next).await?;
        debug!(quantity = updated.quantity, "Cart quantity updated");
        Ok(Some(updated))
    }

    async fn commit(&mut self, next: Vec<CartLineItem>) -> Result<(), StorageError> {
        self.storage.save(Namespace::Cart, &next).await?;
        self.lines = next;
        Ok(())
    }
}

/// Merge lines sharing a key and clamp quantities to at least 1.
fn consolidate(lines: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(lines.len());
    for mut line in lines {
        line.quantity = line.quantity.max(1);
        let key = line.key();
        if let Some(existing) = merged.iter_mut().find(|candidate| candidate.matches(&key)) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            merged.push(line);
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use vitrine_core::{Money, ProductId};

    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    fn product(id: i64, cents: i64) -> CatalogProduct {
        CatalogProduct {
            product_id: ProductId::new(id),
            name: format!("Produto {id}"),
            unit_price: Money::from_cents(cents),
            image_ref: format!("/img/{id}.jpg"),
        }
    }

    fn empty_cart() -> (CartStore, Arc<MemoryStorage>) {
        let memory = Arc::new(MemoryStorage::new());
        let storage = BoundedStorage::new(memory.clone(), Duration::from_secs(1));
        (CartStore::new(storage, ShippingRule::default()), memory)
    }

    /// Accepts loads, refuses saves.
    struct ReadOnly;

    #[async_trait]
    impl Storage for ReadOnly {
        async fn load(&self, _: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
            Ok(None)
        }

        async fn save(&self, _: Namespace, _: serde_json::Value) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".to_string()))
        }

        async fn remove(&self, _: Namespace) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_same_key_merges_into_one_line() {
        let (mut cart, _) = empty_cart();
        let selection = ItemSelection::plain(product(1, 5_000)).with_size("M").with_color("Preto");

        cart.add_item(selection.clone(), 2).await.unwrap();
        let line = cart.add_item(selection, 3).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(line.quantity, 5);
    }

    #[tokio::test]
    async fn test_different_variants_are_separate_lines() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 5_000)).with_size("M"), 1)
            .await
            .unwrap();
        cart.add_item(ItemSelection::plain(product(1, 5_000)).with_size("G"), 1)
            .await
            .unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_merge_keeps_original_price() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 5_000)), 1).await.unwrap();
        let line = cart
            .add_item(ItemSelection::plain(product(1, 9_999)), 1)
            .await
            .unwrap();
        assert_eq!(line.unit_price, Money::from_cents(5_000));
    }

    #[tokio::test]
    async fn test_zero_quantity_add_counts_as_one() {
        let (mut cart, _) = empty_cart();
        let line = cart.add_item(ItemSelection::plain(product(1, 100)), 0).await.unwrap();
        assert_eq!(line.quantity, 1);
    }

    #[tokio::test]
    async fn test_update_quantity_clamps_to_one() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 100)), 4).await.unwrap();
        let key = LineKey::plain(ProductId::new(1));

        let line = cart.update_quantity(&key, 0).await.unwrap().unwrap();
        assert_eq!(line.quantity, 1);

        let line = cart.update_quantity(&key, 9).await.unwrap().unwrap();
        assert_eq!(line.quantity, 9);
    }

    #[tokio::test]
    async fn test_adjust_quantity_never_drops_below_one() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 100)), 2).await.unwrap();
        let key = LineKey::plain(ProductId::new(1));

        assert_eq!(cart.adjust_quantity(&key, -1).await.unwrap().unwrap().quantity, 1);
        assert_eq!(cart.adjust_quantity(&key, -5).await.unwrap().unwrap().quantity, 1);
        assert_eq!(cart.adjust_quantity(&key, 3).await.unwrap().unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn test_absent_key_is_a_no_op() {
        let (mut cart, memory) = empty_cart();
        let key = LineKey::plain(ProductId::new(404));

        assert!(cart.update_quantity(&key, 3).await.unwrap().is_none());
        assert!(cart.remove_item(&key).await.unwrap().is_none());
        assert!(memory.document(Namespace::Cart).is_none());
    }

    #[tokio::test]
    async fn test_remove_item() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 100)), 1).await.unwrap();
        cart.add_item(ItemSelection::plain(product(2, 100)), 1).await.unwrap();

        let removed = cart.remove_item(&LineKey::plain(ProductId::new(1))).await.unwrap();
        assert_eq!(removed.unwrap().product_id, ProductId::new(1));
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_pricing_free_shipping() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 15_000)), 2).await.unwrap();
        cart.add_item(ItemSelection::plain(product(2, 8_000)), 1).await.unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.pricing.subtotal, Money::from_cents(38_000));
        assert_eq!(snapshot.pricing.shipping, Money::ZERO);
        assert_eq!(snapshot.pricing.total, Money::from_cents(38_000));
        assert_eq!(snapshot.remaining_for_free_shipping, Money::ZERO);
    }

    #[tokio::test]
    async fn test_snapshot_pricing_flat_fee() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 5_000)), 1).await.unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.pricing.subtotal, Money::from_cents(5_000));
        assert_eq!(snapshot.pricing.shipping, Money::from_cents(2_990));
        assert_eq!(snapshot.pricing.total, Money::from_cents(7_990));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_cart() {
        let (mut cart, _) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 100)), 1).await.unwrap();
        let snapshot = cart.snapshot();

        cart.add_item(ItemSelection::plain(product(2, 100)), 1).await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_cart_untouched() {
        let storage = BoundedStorage::new(Arc::new(ReadOnly), Duration::from_secs(1));
        let mut cart = CartStore::new(storage, ShippingRule::default());

        let err = cart.add_item(ItemSelection::plain(product(1, 100)), 1).await;
        assert!(matches!(err, Err(StorageError::Unavailable(_))));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_are_persisted_and_reloaded() {
        let (mut cart, memory) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 2_990)).with_color("Azul"), 2)
            .await
            .unwrap();

        let storage = BoundedStorage::new(memory, Duration::from_secs(1));
        let reloaded = CartStore::load(storage, ShippingRule::default()).await.unwrap();
        assert_eq!(reloaded.lines(), cart.lines());
    }

    #[tokio::test]
    async fn test_load_repairs_stored_duplicates() {
        let memory = Arc::new(MemoryStorage::new());
        let mut line = CartLineItem::new(ItemSelection::plain(product(1, 100)), 1);
        line.quantity = 0;
        memory
            .save(Namespace::Cart, serde_json::to_value(vec![line.clone(), line]).unwrap())
            .await
            .unwrap();

        let storage = BoundedStorage::new(memory, Duration::from_secs(1));
        let cart = CartStore::load(storage, ShippingRule::default()).await.unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines().first().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_clear_empties_and_persists() {
        let (mut cart, memory) = empty_cart();
        cart.add_item(ItemSelection::plain(product(1, 100)), 1).await.unwrap();
        cart.clear().await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(memory.document(Namespace::Cart), Some(serde_json::json!([])));
    }

    #[tokio::test]
    async fn test_huge_cart_prices_at_the_money_cap() {
        let (mut cart, memory) = empty_cart();
        let mut priciest = product(1, 0);
        priciest.unit_price = Money::MAX;
        cart.add_item(ItemSelection::plain(priciest), u32::MAX).await.unwrap();
        cart.add_item(ItemSelection::plain(product(2, 100)), 1).await.unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.pricing.subtotal, Money::MAX);
        assert_eq!(snapshot.pricing.total, Money::MAX);

        let storage = BoundedStorage::new(memory, Duration::from_secs(1));
        let reloaded = CartStore::load(storage, ShippingRule::default()).await.unwrap();
        assert_eq!(reloaded.snapshot().pricing.total, Money::MAX);
    }
}
