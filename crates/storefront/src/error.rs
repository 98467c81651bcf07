//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for front ends. Each variant maps to a
//! message safe to show the buyer and to a retryable flag. Infrastructure
//! failures are captured to Sentry by [`AppError::report`].

use thiserror::Error;

use crate::checkout::{SubmitError, ValidationErrors};
use crate::config::ConfigError;
use crate::orders::OrderError;
use crate::postal::LookupError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Order ledger rejected an operation.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Checkout submission failed.
    #[error("Checkout error: {0}")]
    Submit(#[from] SubmitError),

    /// Postal lookup failed.
    #[error("Postal lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Form fields did not validate.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Returns true if the same action may succeed when tried again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(err)
            | Self::Order(OrderError::Storage(err))
            | Self::Submit(SubmitError::Failed(OrderError::Storage(err))) => storage_is_transient(err),
            Self::Submit(SubmitError::InFlight | SubmitError::Aborted)
            | Self::Lookup(LookupError::Timeout | LookupError::Unavailable(_)) => true,
            _ => false,
        }
    }

    /// Returns true for failures of the system rather than of the input.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Storage(_)
                | Self::Order(OrderError::Storage(_))
                | Self::Submit(SubmitError::Aborted | SubmitError::Failed(OrderError::Storage(_)))
        )
    }

    /// Message suitable for the buyer. Internal details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::Storage(StorageError::Corrupt { namespace, .. }) => {
                format!("Saved {namespace} data is damaged")
            }
            Self::Storage(_)
            | Self::Order(OrderError::Storage(_))
            | Self::Submit(SubmitError::Failed(OrderError::Storage(_))) => {
                "Could not save your changes, please try again".to_string()
            }
            Self::Submit(SubmitError::InFlight) => "Your order is already being placed".to_string(),
            Self::Submit(SubmitError::Aborted) => {
                "Something went wrong placing your order, please try again".to_string()
            }
            Self::Submit(SubmitError::Failed(OrderError::EmptyOrder))
            | Self::Order(OrderError::EmptyOrder) => "Your cart is empty".to_string(),
            Self::Submit(SubmitError::Invalid(errors)) | Self::Validation(errors) => {
                format!("Please check the form: {errors}")
            }
            Self::Submit(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Lookup(_) => "Could not look up that zip code, please fill in the address".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Capture infrastructure failures to Sentry and log them.
    pub fn report(&self) {
        if self.is_infrastructure() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront error");
        }
    }
}

const fn storage_is_transient(err: &StorageError) -> bool {
    matches!(
        err,
        StorageError::Timeout { .. } | StorageError::Io { .. } | StorageError::Unavailable(_)
    )
}

/// Set the Sentry user context.
///
/// Call this after sign-in to associate errors with the customer.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
