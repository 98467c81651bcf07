//! Property-based tests for cart consolidation and pricing.
//!
//! These hold for every sequence of cart operations, not just the worked
//! examples in the unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use rust_decimal::Decimal;
use vitrine_core::{Money, ProductId};
use vitrine_storefront::cart::{CartStore, CatalogProduct, ItemSelection, LineKey};
use vitrine_storefront::shipping::ShippingRule;
use vitrine_storefront::storage::{BoundedStorage, MemoryStorage};

// ============================================================================
// Strategies
// ============================================================================

/// Size and color chosen for a product.
type Variant = (Option<&'static str>, Option<&'static str>);

#[derive(Debug, Clone)]
enum CartOp {
    Add {
        product: i64,
        variant: Variant,
        quantity: u32,
    },
    Update {
        product: i64,
        variant: Variant,
        quantity: u32,
    },
    Adjust {
        product: i64,
        variant: Variant,
        delta: i64,
    },
    Remove {
        product: i64,
        variant: Variant,
    },
}

fn size() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("P")), Just(Some("M")), Just(Some("G"))]
}

fn color() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("Preto")), Just(Some("Branco"))]
}

fn variant() -> impl Strategy<Value = Variant> {
    (size(), color())
}

fn cart_op() -> impl Strategy<Value = CartOp> {
    prop_oneof![
        4 => (1..5i64, variant(), 0..20u32).prop_map(|(product, variant, quantity)| CartOp::Add { product, variant, quantity }),
        2 => (1..5i64, variant(), 0..20u32).prop_map(|(product, variant, quantity)| CartOp::Update { product, variant, quantity }),
        2 => (1..5i64, variant(), -30..30i64).prop_map(|(product, variant, delta)| CartOp::Adjust { product, variant, delta }),
        1 => (1..5i64, variant()).prop_map(|(product, variant)| CartOp::Remove { product, variant }),
    ]
}

/// Price in cents for product `id`; stable so merged lines agree.
fn price_cents(id: i64) -> i64 {
    id * 3_333 + 99
}

fn selection(product: i64, (size, color): Variant) -> ItemSelection {
    let mut selection = ItemSelection::plain(CatalogProduct {
        product_id: ProductId::new(product),
        name: format!("Produto {product}"),
        unit_price: Money::from_cents(price_cents(product)),
        image_ref: format!("/img/{product}.jpg"),
    });
    if let Some(size) = size {
        selection = selection.with_size(size);
    }
    if let Some(color) = color {
        selection = selection.with_color(color);
    }
    selection
}

fn key(product: i64, variant: Variant) -> LineKey {
    selection(product, variant).key()
}

fn run(ops: &[CartOp]) -> CartStore {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let storage = BoundedStorage::new(Arc::new(MemoryStorage::new()), Duration::from_secs(1));
        let mut cart = CartStore::new(storage, ShippingRule::default());
        for op in ops {
            match op {
                CartOp::Add {
                    product,
                    variant,
                    quantity,
                } => {
                    cart.add_item(selection(*product, *variant), *quantity).await.unwrap();
                }
                CartOp::Update {
                    product,
                    variant,
                    quantity,
                } => {
                    cart.update_quantity(&key(*product, *variant), *quantity).await.unwrap();
                }
                CartOp::Adjust {
                    product,
                    variant,
                    delta,
                } => {
                    cart.adjust_quantity(&key(*product, *variant), *delta).await.unwrap();
                }
                CartOp::Remove { product, variant } => {
                    cart.remove_item(&key(*product, *variant)).await.unwrap();
                }
            }
        }
        cart
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// No two lines ever share a key.
    #[test]
    fn prop_keys_are_unique(ops in prop::collection::vec(cart_op(), 0..40)) {
        let cart = run(&ops);
        let keys: HashSet<LineKey> = cart.lines().iter().map(|line| line.key()).collect();
        prop_assert_eq!(keys.len(), cart.lines().len());
    }

    /// Quantities never drop below one.
    #[test]
    fn prop_quantities_at_least_one(ops in prop::collection::vec(cart_op(), 0..40)) {
        let cart = run(&ops);
        prop_assert!(cart.lines().iter().all(|line| line.quantity >= 1));
    }

    /// Adding the same combination twice yields one line with the summed quantity.
    #[test]
    fn prop_double_add_merges(product in 1..5i64, variant in variant(), q1 in 1..50u32, q2 in 1..50u32) {
        let cart = run(&[
            CartOp::Add { product, variant, quantity: q1 },
            CartOp::Add { product, variant, quantity: q2 },
        ]);
        prop_assert_eq!(cart.lines().len(), 1);
        prop_assert_eq!(cart.lines().first().unwrap().quantity, q1 + q2);
    }

    /// The same product and size in two colors stays on two lines.
    #[test]
    fn prop_colors_never_merge(product in 1..5i64, size in size(), quantity in 1..20u32) {
        let cart = run(&[
            CartOp::Add { product, variant: (size, Some("Preto")), quantity },
            CartOp::Add { product, variant: (size, Some("Branco")), quantity },
            CartOp::Add { product, variant: (size, None), quantity },
        ]);
        prop_assert_eq!(cart.lines().len(), 3);
        prop_assert_eq!(cart.item_count(), 3 * u64::from(quantity));
    }

    /// Subtotal is the exact sum of price times quantity, and total adds shipping.
    #[test]
    fn prop_pricing_is_exact(ops in prop::collection::vec(cart_op(), 0..40)) {
        let cart = run(&ops);
        let snapshot = cart.snapshot();

        let expected_cents: i64 = cart
            .lines()
            .iter()
            .map(|line| price_cents(line.product_id.as_i64()) * i64::from(line.quantity))
            .sum();
        let subtotal = snapshot.pricing.subtotal.amount();
        prop_assert_eq!(subtotal, Decimal::new(expected_cents, 2));
        prop_assert_eq!(snapshot.pricing.total.amount(), subtotal + snapshot.pricing.shipping.amount());

        let free = subtotal > Decimal::new(ShippingRule::DEFAULT_FREE_THRESHOLD_CENTS, 2);
        prop_assert_eq!(snapshot.pricing.shipping.is_zero(), free);
    }

    /// The shipping fee is a pure function of the subtotal.
    #[test]
    fn prop_shipping_is_deterministic(cents in 0..1_000_000i64) {
        let rule = ShippingRule::default();
        let subtotal = Money::from_cents(cents);
        prop_assert_eq!(rule.fee(subtotal), rule.fee(subtotal));
        let expected = if cents > 20_000 { Money::ZERO } else { Money::from_cents(2_990) };
        prop_assert_eq!(rule.fee(subtotal), expected);
    }
}
