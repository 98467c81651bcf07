//! Checkout wizard.
//!
//! Walks the buyer through four steps:
//!
//! ```text
//! Contact -> Address -> Payment -> Review -> submit()
//! ```
//!
//! `advance()` moves forward only when the current step's fields validate.
//! `retreat()` always moves back and keeps everything typed so far.
//!
//! # Zip code lookup
//!
//! When the zip code reaches eight digits the wizard asks the
//! [`PostalLookup`] collaborator for the street, neighborhood, city and
//! state. The lookup is bounded by a timeout and never blocks the step: any
//! failure leaves the fields for manual entry. An answer that arrives after
//! the buyer changed the zip code is dropped.
//!
//! # Submission
//!
//! `submit()` is single-flight. While one submission is pending, further
//! calls fail with [`SubmitError::InFlight`]. The submission itself runs on
//! its own task and holds the cart lock from snapshot to clear, so it either
//! completes (order created, cart cleared, wizard reset) or fails leaving
//! cart and form untouched. Dropping the caller's future does not stop it.

mod form;
mod step;
mod validation;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::{Instrument, debug, error, info, instrument, warn};
use vitrine_core::{PaymentMethod, ZipCode};

pub use form::{CheckoutForm, Field};
pub use step::CheckoutStep;
pub use validation::{FieldError, Problem, ValidationErrors, validate_step};

use crate::account::CustomerProfile;
use crate::cart::{CartSnapshot, CartStore};
use crate::orders::{Customer, Order, OrderError, OrderLedger, ShippingAddress};
use crate::postal::{LookupError, PostalAddress, PostalLookup};

/// Result of entering a zip code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Fewer than eight digits so far; nothing was looked up.
    Incomplete,
    /// The address fields were filled from the lookup.
    Filled(PostalAddress),
    /// The lookup service does not know this zip code.
    NotFound,
    /// The lookup failed or timed out.
    Unavailable,
    /// The zip code changed while the lookup was running; its answer was dropped.
    Superseded,
    /// No lookup service is configured.
    Disabled,
}

/// Why a submission did not produce an order.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Another submission is still pending.
    #[error("an order is already being submitted")]
    InFlight,

    /// Orders can only be submitted from the review step.
    #[error("checkout is at the {0} step, not review")]
    NotAtReview(CheckoutStep),

    /// Some fields no longer validate.
    #[error("checkout form is incomplete: {0}")]
    Invalid(#[from] ValidationErrors),

    /// The order could not be created. Cart and form are unchanged.
    #[error("could not place order: {0}")]
    Failed(#[from] OrderError),

    /// The submission task died before reporting back.
    #[error("order submission was interrupted")]
    Aborted,
}

#[derive(Debug, Default)]
struct WizardState {
    step: CheckoutStep,
    form: CheckoutForm,
}

/// The checkout wizard.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CheckoutWizard {
    inner: Arc<WizardInner>,
}

struct WizardInner {
    state: Mutex<WizardState>,
    submitting: AtomicBool,
    postal: Option<Arc<dyn PostalLookup>>,
    lookup_timeout: Duration,
    cart: Arc<tokio::sync::Mutex<CartStore>>,
    ledger: Arc<tokio::sync::Mutex<OrderLedger>>,
}

impl CheckoutWizard {
    /// Create a wizard over the shared cart and ledger.
    ///
    /// Without `postal`, zip codes are never looked up.
    #[must_use]
    pub fn new(
        cart: Arc<tokio::sync::Mutex<CartStore>>,
        ledger: Arc<tokio::sync::Mutex<OrderLedger>>,
        postal: Option<Arc<dyn PostalLookup>>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(WizardInner {
                state: Mutex::new(WizardState::default()),
                submitting: AtomicBool::new(false),
                postal,
                lookup_timeout,
                cart,
                ledger,
            }),
        }
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.inner.state().step
    }

    /// Copy of the form as typed so far.
    #[must_use]
    pub fn form(&self) -> CheckoutForm {
        self.inner.state().form.clone()
    }

    /// Returns true while a submission is pending.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.submitting.load(Ordering::Acquire)
    }

    /// Edit a field. Editing the zip code this way never triggers a lookup.
    pub fn set(&self, field: Field, value: &str) {
        self.inner.state().form.set(field, value);
    }

    /// Choose how to pay. Card fields already typed are kept.
    pub fn set_payment_method(&self, method: PaymentMethod) {
        self.inner.state().form.payment_method = method;
    }

    /// Copy a signed-in customer's name and email into empty contact fields.
    pub fn prefill(&self, profile: &CustomerProfile) {
        let mut state = self.inner.state();
        let form = &mut state.form;
        for (field, value) in [
            (Field::FirstName, profile.first_name()),
            (Field::LastName, profile.last_name()),
            (Field::Email, profile.email.as_str()),
        ] {
            if form.get(field).trim().is_empty() && !value.is_empty() {
                form.set(field, value);
            }
        }
    }

    /// Enter a zip code and, once it is complete, look up its address.
    ///
    /// The address fields are overwritten only on a successful lookup whose
    /// zip code still matches the form.
    #[instrument(skip(self))]
    pub async fn enter_zip_code(&self, raw: &str) -> LookupOutcome {
        let digits = {
            let mut state = self.inner.state();
            state.form.set(Field::ZipCode, raw);
            state.form.zip_code.clone()
        };

        let Ok(zip) = ZipCode::parse(&digits) else {
            return LookupOutcome::Incomplete;
        };
        let Some(postal) = self.inner.postal.clone() else {
            return LookupOutcome::Disabled;
        };

        let result = tokio::time::timeout(self.inner.lookup_timeout, postal.lookup(&zip))
            .await
            .unwrap_or(Err(LookupError::Timeout));

        let address = match result {
            Ok(address) => address,
            Err(LookupError::NotFound(_)) => {
                debug!(zip_code = %zip, "Zip code not found");
                return LookupOutcome::NotFound;
            }
            Err(e) => {
                warn!(zip_code = %zip, error = %e, "Postal lookup unavailable, falling back to manual entry");
                return LookupOutcome::Unavailable;
            }
        };

        let mut state = self.inner.state();
        if state.form.zip_code != zip.as_str() {
            debug!(zip_code = %zip, "Dropping stale postal lookup result");
            return LookupOutcome::Superseded;
        }
        let form = &mut state.form;
        form.set(Field::Street, &address.street);
        form.set(Field::Neighborhood, &address.neighborhood);
        form.set(Field::City, &address.city);
        form.set(Field::State, &address.state);
        LookupOutcome::Filled(address)
    }

    /// Move to the next step if the current one validates.
    ///
    /// At Review this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the field problems blocking the current step.
    pub fn advance(&self) -> Result<CheckoutStep, ValidationErrors> {
        let mut state = self.inner.state();
        validate_step(&state.form, state.step)?;
        if let Some(next) = state.step.next() {
            debug!(from = %state.step, to = %next, "Checkout advanced");
            state.step = next;
        }
        Ok(state.step)
    }

    /// Move to the previous step. At Contact this stays put.
    pub fn retreat(&self) -> CheckoutStep {
        let mut state = self.inner.state();
        if let Some(previous) = state.step.previous() {
            state.step = previous;
        }
        state.step
    }

    /// Discard the form and return to Contact.
    ///
    /// The cart is untouched, and a pending submission still runs to completion.
    pub fn abandon(&self) {
        *self.inner.state() = WizardState::default();
        debug!("Checkout abandoned");
    }

    /// Current cart contents and totals.
    pub async fn summary(&self) -> CartSnapshot {
        self.inner.cart.lock().await.snapshot()
    }

    /// Place the order.
    ///
    /// On success the cart is cleared and the wizard returns to an empty
    /// Contact step.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::InFlight`] if another submission is pending
    /// - [`SubmitError::NotAtReview`] if the wizard is not at Review
    /// - [`SubmitError::Invalid`] if any step no longer validates
    /// - [`SubmitError::Failed`] if the ledger rejected or could not save
    ///   the order, including an empty cart
    /// - [`SubmitError::Aborted`] if the submission task panicked
    ///
    /// On every error the cart and the form are left as they were.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Order, SubmitError> {
        let guard = SubmitGuard::acquire(&self.inner).ok_or(SubmitError::InFlight)?;

        let (customer, address, method) = {
            let state = self.inner.state();
            if state.step != CheckoutStep::Review {
                return Err(SubmitError::NotAtReview(state.step));
            }
            validation::order_details(&state.form)?
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move {
                let _guard = guard;
                inner.place_order(customer, address, method).await
            }
            .in_current_span(),
        );

        task.await.map_err(|e| {
            error!(error = %e, "Order submission task failed");
            SubmitError::Aborted
        })?
    }
}

impl WizardInner {
    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn place_order(
        &self,
        customer: Customer,
        address: ShippingAddress,
        method: PaymentMethod,
    ) -> Result<Order, SubmitError> {
        let mut cart = self.cart.lock().await;
        let snapshot = cart.snapshot();

        let order = self
            .ledger
            .lock()
            .await
            .create(snapshot.items, customer, address, method)
            .await?;

        if let Err(e) = cart.clear().await {
            // The order exists. Empty the cart in memory anyway so a retry
            // cannot place it twice; the stale stored cart is overwritten on
            // the next cart change.
            error!(order_id = %order.id, error = %e, "Order placed but the stored cart could not be cleared");
            cart.discard_lines();
        }
        drop(cart);

        *self.state() = WizardState::default();
        info!(order_id = %order.id, total = %order.payment.total, "Order submitted");
        Ok(order)
    }
}

/// Holds the single-flight flag for as long as a submission lives.
struct SubmitGuard {
    inner: Arc<WizardInner>,
}

impl SubmitGuard {
    fn acquire(inner: &Arc<WizardInner>) -> Option<Self> {
        inner
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: Arc::clone(inner),
            })
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.inner.submitting.store(false, Ordering::Release);
    }
}
