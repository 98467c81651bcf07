//! Cart line items and their identity key.

use serde::{Deserialize, Serialize};
use vitrine_core::{Money, ProductId};

/// A product as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image_ref: String,
}

/// A catalog product with the chosen variant options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSelection {
    pub product: CatalogProduct,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl ItemSelection {
    /// Select a product with no size or color.
    #[must_use]
    pub const fn plain(product: CatalogProduct) -> Self {
        Self {
            product,
            size: None,
            color: None,
        }
    }

    /// Choose a size.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Choose a color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Identity key of the line this selection lands in.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

/// Identity of a cart line: product, size and color.
///
/// Two lines with equal keys are the same line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl LineKey {
    /// Key for a product without variant options.
    #[must_use]
    pub const fn plain(product_id: ProductId) -> Self {
        Self {
            product_id,
            size: None,
            color: None,
        }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.product_id)?;
        if let Some(size) = &self.size {
            write!(f, "/{size}")?;
        }
        if let Some(color) = &self.color {
            write!(f, "/{color}")?;
        }
        Ok(())
    }
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image_ref: String,
    /// Always at least 1.
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartLineItem {
    /// Build a line from a selection. `quantity` is raised to 1 if lower.
    #[must_use]
    pub fn new(selection: ItemSelection, quantity: u32) -> Self {
        let ItemSelection {
            product,
            size,
            color,
        } = selection;
        Self {
            product_id: product.product_id,
            name: product.name,
            unit_price: product.unit_price,
            image_ref: product.image_ref,
            quantity: quantity.max(1),
            size,
            color,
        }
    }

    /// This line's identity key.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Returns true if this line is identified by `key`.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
