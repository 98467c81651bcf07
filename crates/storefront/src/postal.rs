//! Postal code lookup port.
//!
//! The checkout wizard uses this to fill in the address from a zip code.
//! Lookups are best-effort: any failure falls back to manual entry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vitrine_core::ZipCode;

/// Address fields resolved from a zip code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// Errors raised by a postal lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The zip code does not exist.
    #[error("zip code {0} not found")]
    NotFound(ZipCode),

    /// The lookup service did not answer in time.
    #[error("postal lookup timed out")]
    Timeout,

    /// The lookup service failed or answered with something unusable.
    #[error("postal lookup unavailable: {0}")]
    Unavailable(String),
}

/// Resolves zip codes to addresses.
#[async_trait]
pub trait PostalLookup: Send + Sync {
    /// Look up `zip`.
    async fn lookup(&self, zip: &ZipCode) -> Result<PostalAddress, LookupError>;
}
