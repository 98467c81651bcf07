//! Vitrine storefront library.
//!
//! The purchase path of the storefront: a cart that consolidates line items
//! and prices them, a four-step checkout wizard, and the order ledger that
//! records orders and governs their status. State is persisted through the
//! [`storage::Storage`] port and addresses are looked up through the
//! [`postal::PostalLookup`] port.
//!
//! [`Storefront`] wires everything together for front ends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
pub mod postal;
pub mod services;
pub mod shipping;
pub mod state;
pub mod storage;

pub use error::AppError;
pub use state::Storefront;
