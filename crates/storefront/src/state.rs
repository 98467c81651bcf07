//! The storefront handle shared by front ends.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::account::Account;
use crate::cart::CartStore;
use crate::checkout::CheckoutWizard;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::orders::OrderLedger;
use crate::postal::PostalLookup;
use crate::services::viacep::ViaCepClient;
use crate::storage::{BoundedStorage, FileStorage, Storage, StorageError};

/// Cart, order ledger, account and checkout wired together.
///
/// This struct is cheaply cloneable via `Arc`. The cart, ledger and account
/// each sit behind an async mutex, so logically concurrent actions are
/// applied one at a time.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    cart: Arc<Mutex<CartStore>>,
    ledger: Arc<Mutex<OrderLedger>>,
    account: Mutex<Account>,
    checkout: CheckoutWizard,
}

impl Storefront {
    /// Load saved state from `storage` and wire the components.
    ///
    /// `postal` is ignored when postal lookup is disabled in `config`.
    /// A corrupt cart or profile is logged and replaced with an empty one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if saved state cannot be read, or if the saved
    /// orders are corrupt.
    #[instrument(skip_all)]
    pub async fn open(
        config: StorefrontConfig,
        storage: Arc<dyn Storage>,
        postal: Option<Arc<dyn PostalLookup>>,
    ) -> Result<Self, StorageError> {
        let storage = BoundedStorage::new(storage, config.storage_timeout);

        let cart = match CartStore::load(storage.clone(), config.shipping).await {
            Ok(cart) => cart,
            Err(err @ StorageError::Corrupt { .. }) => {
                warn!(error = %err, "Saved cart is corrupt, starting with an empty cart");
                CartStore::new(storage.clone(), config.shipping)
            }
            Err(err) => return Err(err),
        };

        let ledger = OrderLedger::load(storage.clone(), config.shipping).await?;

        let account = match Account::load(storage.clone()).await {
            Ok(account) => account,
            Err(err @ StorageError::Corrupt { .. }) => {
                warn!(error = %err, "Saved profile is corrupt, starting signed out");
                let mut account = Account::signed_out(storage.clone());
                account.sign_out().await?;
                account
            }
            Err(err) => return Err(err),
        };

        let postal = postal.filter(|_| config.postal.enabled);
        let cart = Arc::new(Mutex::new(cart));
        let ledger = Arc::new(Mutex::new(ledger));
        let checkout = CheckoutWizard::new(
            Arc::clone(&cart),
            Arc::clone(&ledger),
            postal,
            config.postal.timeout,
        );

        info!(
            cart_lines = cart.lock().await.lines().len(),
            orders = ledger.lock().await.list().len(),
            "Storefront opened"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                cart,
                ledger,
                account: Mutex::new(account),
                checkout,
            }),
        })
    }

    /// Open the storefront on the data directory, with `ViaCEP` lookups.
    ///
    /// # Errors
    ///
    /// Returns an error if the postal client cannot be built or saved state
    /// cannot be loaded.
    pub async fn open_on_disk(config: StorefrontConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.data_dir.clone()));
        let postal: Option<Arc<dyn PostalLookup>> = if config.postal.enabled {
            Some(Arc::new(ViaCepClient::new(
                config.postal.base_url.clone(),
                config.postal.timeout,
            )?))
        } else {
            None
        };
        Ok(Self::open(config, storage, postal).await?)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The shared cart.
    #[must_use]
    pub fn cart(&self) -> &Mutex<CartStore> {
        &self.inner.cart
    }

    /// The shared order ledger.
    #[must_use]
    pub fn ledger(&self) -> &Mutex<OrderLedger> {
        &self.inner.ledger
    }

    /// The signed-in customer.
    #[must_use]
    pub fn account(&self) -> &Mutex<Account> {
        &self.inner.account
    }

    /// The checkout wizard.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutWizard {
        &self.inner.checkout
    }
}
