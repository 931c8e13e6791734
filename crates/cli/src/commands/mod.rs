//! Command implementations.
//!
//! Each command builds what it needs from a [`CommandContext`], reads the
//! session once, and reports through `tracing`.

pub mod cart;
pub mod checkout;
pub mod products;
pub mod session;

use std::sync::Arc;

use shopfront_client::session::SessionStoreError;
use shopfront_client::{
    ApiClient, ApiError, CartClient, CheckoutError, ClientConfig, FileSessionStore,
    SessionContext, SessionStore,
};
use thiserror::Error;

/// Errors that end a command with a non-zero exit status.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The HTTP client could not be built.
    #[error("Client setup failed: {0}")]
    Api(#[from] ApiError),

    /// The session file could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionStoreError),

    /// A checkout precondition failed.
    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    /// The order needs a logged-in user.
    #[error("Login required. Run `shopfront login --token <TOKEN>` and return to {return_to}")]
    LoginRequired { return_to: String },

    /// The operation failed; the message is user-facing.
    #[error("{0}")]
    Failed(String),

    /// Ctrl+C arrived before the operation finished.
    #[error("Cancelled")]
    Cancelled,
}

/// Shared state for a single command invocation.
pub struct CommandContext {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub store: Arc<dyn SessionStore>,
}

impl CommandContext {
    /// Build the API client and open the session file from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, CommandError> {
        let api = ApiClient::new(&config)?;
        let store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::new(config.session_file.clone()));
        Ok(Self { config, api, store })
    }

    /// Identity for this invocation. `SHOPFRONT_BEARER_TOKEN` overrides the
    /// persisted bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file is unreadable.
    pub fn session(&self) -> Result<SessionContext, CommandError> {
        Ok(self
            .store
            .context()?
            .with_bearer_override(self.config.bearer_token.clone()))
    }

    /// A cart client using the configured policies.
    pub fn cart_client(&self) -> CartClient {
        CartClient::from_config(self.api.clone(), Arc::clone(&self.store), &self.config)
    }
}

/// Log every line of `cart` and its totals.
pub fn log_cart(cart: &CartClient) {
    if cart.items().is_empty() {
        tracing::info!("Your cart is empty");
        return;
    }

    for item in cart.items() {
        tracing::info!(
            item_id = %item.id,
            quantity = item.quantity,
            unit_price = %item.price,
            category = %item.category,
            "{}",
            item.name
        );
    }

    let totals = cart.totals();
    tracing::info!(
        items = cart.item_count(),
        subtotal = %totals.subtotal,
        shipping = %totals.shipping,
        tax = %totals.tax,
        total = %totals.total,
        "Cart totals"
    );
}
