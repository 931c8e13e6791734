//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;

pub use id::{AddressId, CartId, CartItemId, GuestToken, IdError, OrderId, ProductId};
pub use price::Amount;
