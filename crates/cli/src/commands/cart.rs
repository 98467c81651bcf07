//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! vitrine cart add --product 7 --name "Camiseta" --price 59,90 --size M
//! vitrine cart update --product 7 --size M --quantity 3
//! vitrine cart adjust --product 7 --size M --by -1
//! vitrine cart remove --product 7 --size M
//! vitrine cart show
//! ```

use clap::Args;
use vitrine_core::{Money, ProductId};
use vitrine_storefront::AppError;
use vitrine_storefront::Storefront;
use vitrine_storefront::cart::{CartLineItem, CartSnapshot, CatalogProduct, ItemSelection, LineKey};
use vitrine_storefront::error::add_breadcrumb;

/// Identifies a cart line.
#[derive(Args, Debug, Clone)]
pub struct LineArgs {
    /// Product ID
    #[arg(short, long)]
    pub product: ProductId,

    /// Size option
    #[arg(long)]
    pub size: Option<String>,

    /// Color option
    #[arg(long)]
    pub color: Option<String>,
}

impl LineArgs {
    fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

/// A catalog product with the chosen options.
#[derive(Args, Debug, Clone)]
pub struct ProductArgs {
    #[command(flatten)]
    pub line: LineArgs,

    /// Product name
    #[arg(long)]
    pub name: String,

    /// Unit price, e.g. 59,90 or 59.90
    #[arg(long)]
    pub price: Money,

    /// Product image path or URL
    #[arg(long, default_value = "")]
    pub image: String,
}

impl ProductArgs {
    fn into_selection(self) -> ItemSelection {
        ItemSelection {
            product: CatalogProduct {
                product_id: self.line.product,
                name: self.name,
                unit_price: self.price,
                image_ref: self.image,
            },
            size: self.line.size,
            color: self.line.color,
        }
    }
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be saved.
pub async fn add(storefront: &Storefront, product: ProductArgs, quantity: u32) -> Result<(), AppError> {
    let selection = product.into_selection();
    let product_id = selection.product.product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));

    let mut cart = storefront.cart().lock().await;
    let line = cart.add_item(selection, quantity).await?;
    tracing::info!("Added: {}", describe(&line));
    tracing::info!("Cart now has {} item(s)", cart.item_count());
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the line is not in the cart or the cart cannot be saved.
pub async fn update(storefront: &Storefront, line: &LineArgs, quantity: u32) -> Result<(), AppError> {
    let key = line.key();
    let updated = storefront
        .cart()
        .lock()
        .await
        .update_quantity(&key, quantity)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cart line {key}")))?;
    tracing::info!("Updated: {}", describe(&updated));
    Ok(())
}

/// Change a line's quantity by a signed amount.
///
/// # Errors
///
/// Returns an error if the line is not in the cart or the cart cannot be saved.
pub async fn adjust(storefront: &Storefront, line: &LineArgs, delta: i64) -> Result<(), AppError> {
    let key = line.key();
    let updated = storefront
        .cart()
        .lock()
        .await
        .adjust_quantity(&key, delta)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cart line {key}")))?;
    tracing::info!("Updated: {}", describe(&updated));
    Ok(())
}

/// Remove a line. Removing a line that is not there is not an error.
///
/// # Errors
///
/// Returns an error if the cart cannot be saved.
pub async fn remove(storefront: &Storefront, line: &LineArgs) -> Result<(), AppError> {
    let key = line.key();
    match storefront.cart().lock().await.remove_item(&key).await? {
        Some(removed) => tracing::info!("Removed: {}", describe(&removed)),
        None => tracing::info!("Line {key} was not in the cart"),
    }
    Ok(())
}

/// Show the cart with totals.
pub async fn show(storefront: &Storefront) {
    let snapshot = storefront.cart().lock().await.snapshot();
    log_snapshot(&snapshot);
}

pub(crate) fn log_snapshot(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        tracing::info!("Cart is empty");
        return;
    }

    for line in &snapshot.items {
        tracing::info!("  {}", describe(line));
    }
    tracing::info!("Subtotal: {}", snapshot.pricing.subtotal);
    if snapshot.pricing.shipping.is_zero() {
        tracing::info!("Shipping: free");
    } else {
        tracing::info!(
            "Shipping: {} (add {} more for free shipping)",
            snapshot.pricing.shipping,
            snapshot.remaining_for_free_shipping
        );
    }
    tracing::info!("Total:    {}", snapshot.pricing.total);
}

fn describe(line: &CartLineItem) -> String {
    format!(
        "{} x {} [{}] @ {} = {}",
        line.quantity,
        line.name,
        line.key(),
        line.unit_price,
        line.line_total()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_line() {
        let selection = ProductArgs {
            line: LineArgs {
                product: ProductId::new(7),
                size: Some("M".to_string()),
                color: None,
            },
            name: "Camiseta".to_string(),
            price: Money::parse("59,90").unwrap(),
            image: String::new(),
        }
        .into_selection();
        let line = CartLineItem::new(selection, 2);

        assert_eq!(describe(&line), "2 x Camiseta [7/M] @ R$ 59,90 = R$ 119,80");
    }
}
