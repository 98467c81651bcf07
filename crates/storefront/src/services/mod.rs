//! Adapters for external services.
//!
//! # Services
//!
//! - `viacep` - Brazilian postal code lookup ([`crate::postal::PostalLookup`])

pub mod viacep;
