//! Command implementations.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod orders;
