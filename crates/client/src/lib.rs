//! Shopfront Client - storefront state over the REST backend.
//!
//! # Modules
//!
//! - [`api`] - Typed HTTP client for the cart, address, order and product endpoints
//! - [`cart`] - Cart state with optimistic mutations and fallback data
//! - [`checkout`] - Address/payment selection and order placement
//! - [`catalog`] - Product page fetching with caching and fallback
//! - [`session`] - Bearer/guest identity and its persistence
//! - [`config`] - Environment-based configuration
//! - [`error`] - User-facing failure messages and Sentry capture
//!
//! # Identity
//!
//! Every request takes an explicit [`SessionContext`]. A bearer token always
//! wins over a guest token; the guest token is only sent (as a query
//! parameter) when fetching the cart.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod fallback;
pub mod session;
pub mod types;

pub use api::{ApiClient, ApiError};
pub use cart::{CartClient, CartLoad, CartSource, FallbackPolicy, MutationOutcome, MutationPolicy};
pub use catalog::{CatalogFetcher, CatalogPage, CatalogSource};
pub use checkout::{Checkout, CheckoutError, CheckoutPhase, PaymentMethod, PlaceOrderOutcome};
pub use config::{ClientConfig, ConfigError};
pub use session::{FileSessionStore, MemorySessionStore, SessionContext, SessionStore, StoredSession};
pub use types::{Address, Cart, CartItem, PlacedOrder, Product};
