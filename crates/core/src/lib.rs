//! Shopfront Core - Shared types library.
//!
//! This crate provides common types used across all Shopfront components:
//! - `client` - REST client for the storefront backend (cart, checkout, catalog)
//! - `cli` - Command-line front end for the client
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and amounts
//! - [`pricing`] - Subtotal, shipping, tax and total for a set of cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{CartTotals, PricedLine, PricingRules};
pub use types::*;
