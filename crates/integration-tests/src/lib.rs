//! Integration tests for Vitrine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vitrine-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `purchase_flow` - cart to order through the checkout wizard
//! - `order_lifecycle` - status transitions on a storefront
//! - `postal_lookup` - zip code lookup and its fallbacks
//! - `persistence` - state on disk across restarts, corrupt documents
//! - `slow_storage` - order saves that outlive the storage deadline
//!
//! Everything runs in-process against [`MemoryStorage`] or a temporary
//! directory. No network access is needed.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use vitrine_core::{Money, PaymentMethod, ProductId, ZipCode};
use vitrine_storefront::Storefront;
use vitrine_storefront::cart::{CatalogProduct, ItemSelection};
use vitrine_storefront::checkout::{CheckoutStep, CheckoutWizard, Field};
use vitrine_storefront::config::StorefrontConfig;
use vitrine_storefront::postal::{LookupError, PostalAddress, PostalLookup};
use vitrine_storefront::storage::{MemoryStorage, Namespace, Storage, StorageError};

// =============================================================================
// Configuration
// =============================================================================

/// Default configuration rooted at `data_dir`, with `overrides` applied.
#[must_use]
pub fn config(data_dir: &Path, overrides: &[(&str, &str)]) -> StorefrontConfig {
    let mut vars: HashMap<String, String> = overrides
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    vars.entry("VITRINE_DATA_DIR".to_string())
        .or_insert_with(|| data_dir.display().to_string());
    StorefrontConfig::from_source(|key| vars.get(key).cloned()).unwrap()
}

// =============================================================================
// Catalog
// =============================================================================

/// A R$ 79,90 t-shirt in size M.
#[must_use]
pub fn shirt() -> ItemSelection {
    ItemSelection::plain(CatalogProduct {
        product_id: ProductId::new(7),
        name: "Camiseta Básica".to_string(),
        unit_price: Money::from_cents(7_990),
        image_ref: "/img/camiseta.jpg".to_string(),
    })
    .with_size("M")
}

/// R$ 249,90 sneakers, size 42, white.
#[must_use]
pub fn sneakers() -> ItemSelection {
    ItemSelection::plain(CatalogProduct {
        product_id: ProductId::new(12),
        name: "Tênis Casual".to_string(),
        unit_price: Money::from_cents(24_990),
        image_ref: "/img/tenis.jpg".to_string(),
    })
    .with_size("42")
    .with_color("Branco")
}

/// The address `ViaCEP` returns for 01310-100.
#[must_use]
pub fn paulista() -> PostalAddress {
    PostalAddress {
        street: "Avenida Paulista".to_string(),
        neighborhood: "Bela Vista".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Fill every step with valid data and walk the wizard to Review.
pub fn fill_to_review(wizard: &CheckoutWizard) {
    for (field, value) in [
        (Field::FirstName, "Ana"),
        (Field::LastName, "Souza"),
        (Field::Email, "ana@loja.com.br"),
        (Field::Phone, "(11) 98765-4321"),
        (Field::ZipCode, "01310-100"),
        (Field::Street, "Avenida Paulista"),
        (Field::Number, "1000"),
        (Field::Neighborhood, "Bela Vista"),
        (Field::City, "São Paulo"),
        (Field::State, "SP"),
        (Field::CardNumber, "4111 1111 1111 1111"),
        (Field::CardName, "ANA SOUZA"),
        (Field::CardExpiry, "12/30"),
        (Field::CardCvv, "123"),
    ] {
        wizard.set(field, value);
    }
    wizard.set_payment_method(PaymentMethod::Credit);

    while wizard.step() != CheckoutStep::Review {
        wizard.advance().unwrap();
    }
}

// =============================================================================
// Postal lookup fake
// =============================================================================

/// Answers lookups from a fixed table, optionally after a delay.
///
/// Unknown zip codes are reported as not found.
#[derive(Default)]
pub struct FakePostal {
    addresses: HashMap<String, PostalAddress>,
    delay: Option<Duration>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl FakePostal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `zip` with `address`.
    #[must_use]
    pub fn with(mut self, zip: &str, address: PostalAddress) -> Self {
        self.addresses.insert(ZipCode::digits_of(zip), address);
        self
    }

    /// Wait `delay` before answering.
    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every lookup as if the service were down.
    #[must_use]
    pub const fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Lookups received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostalLookup for FakePostal {
    async fn lookup(&self, zip: &ZipCode) -> Result<PostalAddress, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(LookupError::Unavailable("connection refused".to_string()));
        }
        self.addresses
            .get(zip.as_str())
            .cloned()
            .ok_or_else(|| LookupError::NotFound(zip.clone()))
    }
}

// =============================================================================
// Storage fakes
// =============================================================================

/// In-memory storage whose saves can be made to fail per namespace.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing: Mutex<HashSet<Namespace>>,
    save_delay: Option<Duration>,
    late: Mutex<HashMap<Namespace, Duration>>,
}

impl FlakyStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `delay` in every save.
    #[must_use]
    pub const fn slow_saves(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// From now on, saves under `namespace` land only after `delay`.
    ///
    /// The write completes even if the caller gave up waiting for it.
    pub fn delay_saves(&self, namespace: Namespace, delay: Duration) {
        self.late
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace, delay);
    }

    /// Make saves and removes under `namespace` fail.
    pub fn fail(&self, namespace: Namespace) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace);
    }

    /// Let `namespace` work again.
    pub fn recover(&self, namespace: Namespace) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&namespace);
    }

    /// Raw stored document.
    #[must_use]
    pub fn document(&self, namespace: Namespace) -> Option<serde_json::Value> {
        self.inner.document(namespace)
    }

    fn check(&self, namespace: Namespace) -> Result<(), StorageError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&namespace);
        if failing {
            Err(StorageError::Unavailable(format!("{namespace} is read-only")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn load(&self, namespace: Namespace) -> Result<Option<serde_json::Value>, StorageError> {
        self.inner.load(namespace).await
    }

    async fn save(&self, namespace: Namespace, value: serde_json::Value) -> Result<(), StorageError> {
        let late = self
            .late
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&namespace)
            .copied();
        if let Some(delay) = late.or(self.save_delay) {
            tokio::time::sleep(delay).await;
        }
        self.check(namespace)?;
        self.inner.save(namespace, value).await
    }

    async fn remove(&self, namespace: Namespace) -> Result<(), StorageError> {
        self.check(namespace)?;
        self.inner.remove(namespace).await
    }
}

// =============================================================================
// Storefront
// =============================================================================

/// A storefront over `storage` with default settings and postal lookup off.
pub async fn storefront(storage: Arc<dyn Storage>) -> Storefront {
    storefront_with(storage, &[]).await
}

/// A storefront over `storage` with extra config, without zip code lookup.
pub async fn storefront_with(storage: Arc<dyn Storage>, overrides: &[(&str, &str)]) -> Storefront {
    let dir = std::env::temp_dir();
    let mut vars = vec![("VITRINE_POSTAL_LOOKUP", "off")];
    vars.extend_from_slice(overrides);
    let config = config(&dir, &vars);
    Storefront::open(config, storage, None).await.unwrap()
}

/// A storefront over `storage` that resolves zip codes with `postal`.
pub async fn storefront_with_postal(
    storage: Arc<dyn Storage>,
    postal: Arc<dyn PostalLookup>,
    overrides: &[(&str, &str)],
) -> Storefront {
    let dir = std::env::temp_dir();
    let config = config(&dir, overrides);
    Storefront::open(config, storage, Some(postal)).await.unwrap()
}
