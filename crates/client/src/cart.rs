//! Cart client: fetches the server-held cart and mutates it.
//!
//! [`CartClient`] owns the local view of one cart. Loading never fails from
//! the caller's perspective: a failed fetch goes through the configured
//! [`FallbackPolicy`] and the outcome says which branch was taken.
//!
//! Quantity updates and removals are applied locally before the request
//! settles. What happens to local state when the request fails is decided by
//! the [`MutationPolicy`]:
//!
//! - `Optimistic` keeps the local change and surfaces an error. Local state
//!   may then disagree with the server until the next load.
//! - `Rollback` restores the state from before the mutation.
//!
//! A cancelled mutation always restores the previous state.

use std::str::FromStr;
use std::sync::Arc;

use shopfront_core::{CartId, CartItemId, CartTotals, PricingRules, ProductId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::api::{ApiClient, ApiError};
use crate::config::ClientConfig;
use crate::error::{Operation, report};
use crate::fallback;
use crate::session::{SessionContext, SessionStore};
use crate::types::{Cart, CartItem};

// =============================================================================
// Policies
// =============================================================================

/// Error parsing a policy name.
#[derive(Debug, Clone, Error)]
#[error("unknown policy '{0}'")]
pub struct ParsePolicyError(String);

/// What happens to local state when a cart mutation request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPolicy {
    /// Keep the local change regardless of the server's answer.
    #[default]
    Optimistic,
    /// Restore the previous local state.
    Rollback,
}

impl FromStr for MutationPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "rollback" => Ok(Self::Rollback),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// What a cart load shows when the fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Show the fixed mock cart.
    #[default]
    MockCart,
    /// Show an empty cart.
    Empty,
}

impl FromStr for FallbackPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" | "mock-cart" => Ok(Self::MockCart),
            "empty" => Ok(Self::Empty),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Where the current cart contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartSource {
    /// Nothing loaded yet.
    #[default]
    Unloaded,
    /// Fetched from the server.
    Live,
    /// Substituted after a failed fetch.
    Fallback,
}

/// Result of [`CartClient::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartLoad {
    /// The server cart is now the local cart.
    Live,
    /// The fetch failed and the fallback policy was applied.
    Fallback { error: String },
    /// The load was cancelled; local state is unchanged.
    Cancelled,
}

/// Result of a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted the change.
    Confirmed,
    /// The server rejected the change but the local change was kept.
    Diverged { error: String },
    /// The server rejected the change and local state was restored.
    RolledBack { error: String },
    /// The change was invalid; no request was made and local state is unchanged.
    Rejected { error: String },
    /// The mutation was cancelled; local state is unchanged.
    Cancelled,
}

impl MutationOutcome {
    /// The user-facing error, if the mutation failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Diverged { error } | Self::RolledBack { error } | Self::Rejected { error } => {
                Some(error)
            }
            Self::Confirmed | Self::Cancelled => None,
        }
    }
}

// =============================================================================
// CartClient
// =============================================================================

/// Local view of a server-held cart.
pub struct CartClient {
    api: ApiClient,
    store: Arc<dyn SessionStore>,
    mutation_policy: MutationPolicy,
    fallback_policy: FallbackPolicy,
    rules: PricingRules,
    cart_id: Option<CartId>,
    items: Vec<CartItem>,
    source: CartSource,
    error: Option<String>,
}

impl std::fmt::Debug for CartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartClient")
            .field("mutation_policy", &self.mutation_policy)
            .field("fallback_policy", &self.fallback_policy)
            .field("cart_id", &self.cart_id)
            .field("items", &self.items)
            .field("source", &self.source)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl CartClient {
    /// Create an empty, unloaded cart client.
    #[must_use]
    pub fn new(
        api: ApiClient,
        store: Arc<dyn SessionStore>,
        mutation_policy: MutationPolicy,
        fallback_policy: FallbackPolicy,
    ) -> Self {
        Self {
            api,
            store,
            mutation_policy,
            fallback_policy,
            rules: PricingRules::default(),
            cart_id: None,
            items: Vec::new(),
            source: CartSource::Unloaded,
            error: None,
        }
    }

    /// Create a cart client with the policies from `config`.
    #[must_use]
    pub fn from_config(api: ApiClient, store: Arc<dyn SessionStore>, config: &ClientConfig) -> Self {
        Self::new(api, store, config.mutation_policy, config.cart_fallback)
    }

    /// Fetch the server cart for the context's identity without touching
    /// local state.
    ///
    /// # Errors
    ///
    /// Returns the underlying API error on any failure.
    pub async fn fetch_cart(
        &self,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> Result<Cart, ApiError> {
        self.api.get_cart(ctx, cancel).await
    }

    /// Load the cart into local state, applying the fallback policy on
    /// failure.
    #[instrument(skip_all)]
    pub async fn load(&mut self, ctx: &SessionContext, cancel: &CancellationToken) -> CartLoad {
        match self.fetch_cart(ctx, cancel).await {
            Ok(cart) => {
                self.accept(ctx, cart);
                CartLoad::Live
            }
            Err(e) if e.is_cancelled() => {
                debug!("Cart load cancelled");
                CartLoad::Cancelled
            }
            Err(e) => {
                let error = report(Operation::FetchCart, &e);
                self.cart_id = None;
                self.items = match self.fallback_policy {
                    FallbackPolicy::MockCart => fallback::mock_cart_items(),
                    FallbackPolicy::Empty => Vec::new(),
                };
                self.source = CartSource::Fallback;
                self.error = Some(error.clone());
                CartLoad::Fallback { error }
            }
        }
    }

    /// Replace local state with a fetched cart.
    fn accept(&mut self, ctx: &SessionContext, cart: Cart) {
        if !ctx.is_authenticated()
            && let Some(token) = &cart.guest_token
        {
            match self.store.remember_guest_token(token) {
                Ok(true) => debug!("Persisted new guest token"),
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to persist guest token"),
            }
        }

        self.cart_id = Some(cart.id);
        self.items = cart.items;
        self.source = CartSource::Live;
        self.error = None;
    }

    /// Set a line's quantity. A quantity of zero or less removes the line.
    #[instrument(skip(self, ctx, cancel), fields(item_id = %item_id))]
    pub async fn update_quantity(
        &mut self,
        ctx: &SessionContext,
        item_id: &CartItemId,
        new_quantity: i64,
        cancel: &CancellationToken,
    ) -> MutationOutcome {
        if new_quantity <= 0 {
            return self.remove_item(ctx, item_id, cancel).await;
        }
        let Ok(quantity) = u32::try_from(new_quantity) else {
            return self.reject(format!("Quantity cannot exceed {}.", u32::MAX));
        };

        let snapshot = self.items.clone();
        if let Some(item) = self.items.iter_mut().find(|i| &i.id == item_id) {
            item.quantity = quantity;
        }

        let result = self
            .api
            .update_cart_item(ctx, item_id, quantity, cancel)
            .await;
        self.settle(Operation::UpdateQuantity, snapshot, result)
    }

    /// Remove a line.
    #[instrument(skip(self, ctx, cancel), fields(item_id = %item_id))]
    pub async fn remove_item(
        &mut self,
        ctx: &SessionContext,
        item_id: &CartItemId,
        cancel: &CancellationToken,
    ) -> MutationOutcome {
        let snapshot = self.items.clone();
        self.items.retain(|i| &i.id != item_id);

        let result = self.api.remove_cart_item(ctx, item_id, cancel).await;
        self.settle(Operation::RemoveItem, snapshot, result)
    }

    /// Refuse a mutation before any request is made.
    fn reject(&mut self, error: String) -> MutationOutcome {
        tracing::warn!(%error, "Cart mutation rejected");
        self.error = Some(error.clone());
        MutationOutcome::Rejected { error }
    }

    /// Resolve a mutation against the policy once its request has settled.
    fn settle(
        &mut self,
        operation: Operation,
        snapshot: Vec<CartItem>,
        result: Result<(), ApiError>,
    ) -> MutationOutcome {
        match result {
            Ok(()) => {
                self.error = None;
                MutationOutcome::Confirmed
            }
            Err(e) if e.is_cancelled() => {
                self.items = snapshot;
                MutationOutcome::Cancelled
            }
            Err(e) => {
                let error = report(operation, &e);
                self.error = Some(error.clone());
                match self.mutation_policy {
                    MutationPolicy::Optimistic => MutationOutcome::Diverged { error },
                    MutationPolicy::Rollback => {
                        self.items = snapshot;
                        MutationOutcome::RolledBack { error }
                    }
                }
            }
        }
    }

    /// Add a product, then reload the cart from the server.
    ///
    /// Not optimistic: the new line's ID only exists once the server made
    /// it. If no live cart is loaded yet, the cart is fetched first to learn
    /// its ID. A quantity of zero is rejected without a request.
    #[instrument(skip(self, ctx, cancel), fields(product_id = %product_id))]
    pub async fn add_item(
        &mut self,
        ctx: &SessionContext,
        product_id: &ProductId,
        quantity: u32,
        cancel: &CancellationToken,
    ) -> MutationOutcome {
        if quantity == 0 {
            return self.reject("Quantity must be at least 1.".to_string());
        }

        let result = self.try_add_item(ctx, product_id, quantity, cancel).await;
        match result {
            Ok(cart) => {
                self.accept(ctx, cart);
                MutationOutcome::Confirmed
            }
            Err(e) if e.is_cancelled() => MutationOutcome::Cancelled,
            Err(e) => {
                let error = report(Operation::AddItem, &e);
                self.error = Some(error.clone());
                MutationOutcome::RolledBack { error }
            }
        }
    }

    async fn try_add_item(
        &self,
        ctx: &SessionContext,
        product_id: &ProductId,
        quantity: u32,
        cancel: &CancellationToken,
    ) -> Result<Cart, ApiError> {
        let cart_id = match (&self.cart_id, self.source) {
            (Some(id), CartSource::Live) => id.clone(),
            _ => self.fetch_cart(ctx, cancel).await?.id,
        };

        self.api
            .add_cart_item(ctx, &cart_id, product_id, quantity, cancel)
            .await?;
        self.fetch_cart(ctx, cancel).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current lines.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Server cart ID. `None` until a live load succeeds, and after a
    /// fallback.
    #[must_use]
    pub const fn cart_id(&self) -> Option<&CartId> {
        self.cart_id.as_ref()
    }

    /// Where the current lines came from.
    #[must_use]
    pub const fn source(&self) -> CartSource {
        self.source
    }

    /// The last user-facing error, if the last operation failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Dismiss the current error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Pricing for the current lines.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.rules.calculate(&self.items)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// The session store this client persists guest tokens to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::Amount;

    use super::*;
    use crate::session::MemorySessionStore;

    /// Nothing listens on the discard port, so every request fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9/";

    fn client(mutation: MutationPolicy, fallback: FallbackPolicy) -> CartClient {
        let config = ClientConfig::new(UNREACHABLE).unwrap();
        let api = ApiClient::new(&config).unwrap();
        CartClient::new(api, Arc::new(MemorySessionStore::default()), mutation, fallback)
    }

    async fn loaded(mutation: MutationPolicy) -> CartClient {
        let mut cart = client(mutation, FallbackPolicy::MockCart);
        let load = cart
            .load(&SessionContext::anonymous(), &CancellationToken::new())
            .await;
        assert!(matches!(load, CartLoad::Fallback { .. }));
        cart
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Rollback".parse::<MutationPolicy>().unwrap(), MutationPolicy::Rollback);
        assert_eq!("mock".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::MockCart);
        assert!("never".parse::<MutationPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_load_failure_uses_mock_cart() {
        let cart = loaded(MutationPolicy::Optimistic).await;
        assert_eq!(cart.items(), fallback::mock_cart_items().as_slice());
        assert_eq!(cart.source(), CartSource::Fallback);
        assert!(cart.cart_id().is_none());
        assert_eq!(cart.error(), Some(Operation::FetchCart.failure_message()));
    }

    #[tokio::test]
    async fn test_load_failure_with_empty_policy() {
        let mut cart = client(MutationPolicy::Optimistic, FallbackPolicy::Empty);
        let load = cart
            .load(&SessionContext::anonymous(), &CancellationToken::new())
            .await;
        assert!(matches!(load, CartLoad::Fallback { .. }));
        assert!(cart.items().is_empty());
        assert_eq!(cart.totals(), CartTotals::default());
        assert_eq!(cart.error(), Some("Could not load your cart."));
    }

    #[tokio::test]
    async fn test_cancelled_load_leaves_state() {
        let mut cart = client(MutationPolicy::Optimistic, FallbackPolicy::MockCart);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let load = cart.load(&SessionContext::anonymous(), &cancel).await;
        assert_eq!(load, CartLoad::Cancelled);
        assert!(cart.items().is_empty());
        assert_eq!(cart.source(), CartSource::Unloaded);
        assert!(cart.error().is_none());
    }

    #[tokio::test]
    async fn test_optimistic_update_kept_on_failure() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        let id = CartItemId::new("mock-item-1");

        let outcome = cart
            .update_quantity(&SessionContext::anonymous(), &id, 5, &CancellationToken::new())
            .await;

        assert!(matches!(outcome, MutationOutcome::Diverged { .. }));
        assert_eq!(cart.items().iter().find(|i| i.id == id).unwrap().quantity, 5);
        assert_eq!(cart.error(), Some(Operation::UpdateQuantity.failure_message()));
    }

    #[tokio::test]
    async fn test_rollback_update_restored_on_failure() {
        let mut cart = loaded(MutationPolicy::Rollback).await;
        let id = CartItemId::new("mock-item-1");

        let outcome = cart
            .update_quantity(&SessionContext::anonymous(), &id, 5, &CancellationToken::new())
            .await;

        assert!(matches!(outcome, MutationOutcome::RolledBack { .. }));
        assert_eq!(cart.items(), fallback::mock_cart_items().as_slice());
    }

    #[tokio::test]
    async fn test_update_to_zero_equals_remove() {
        let ctx = SessionContext::anonymous();
        let cancel = CancellationToken::new();
        let id = CartItemId::new("mock-item-2");

        let mut via_update = loaded(MutationPolicy::Optimistic).await;
        via_update.update_quantity(&ctx, &id, 0, &cancel).await;

        let mut via_remove = loaded(MutationPolicy::Optimistic).await;
        via_remove.remove_item(&ctx, &id, &cancel).await;

        assert_eq!(via_update.items(), via_remove.items());
        assert_eq!(via_update.error(), via_remove.error());
        assert!(via_update.items().iter().all(|i| i.id != id));
    }

    #[tokio::test]
    async fn test_negative_quantity_removes() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        let id = CartItemId::new("mock-item-1");
        cart.update_quantity(&SessionContext::anonymous(), &id, -2, &CancellationToken::new())
            .await;
        assert!(cart.items().iter().all(|i| i.id != id));
    }

    #[tokio::test]
    async fn test_rollback_remove_restores_position() {
        let mut cart = loaded(MutationPolicy::Rollback).await;
        cart.remove_item(
            &SessionContext::anonymous(),
            &CartItemId::new("mock-item-1"),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(cart.items(), fallback::mock_cart_items().as_slice());
    }

    #[tokio::test]
    async fn test_cancelled_mutation_restores_state() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        cart.clear_error();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = cart
            .remove_item(&SessionContext::anonymous(), &CartItemId::new("mock-item-1"), &cancel)
            .await;

        assert_eq!(outcome, MutationOutcome::Cancelled);
        assert_eq!(cart.items(), fallback::mock_cart_items().as_slice());
        assert!(cart.error().is_none());
    }

    #[tokio::test]
    async fn test_totals_follow_local_state() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        assert_eq!(cart.totals().total, Amount::new(758_500));
        assert_eq!(cart.item_count(), 3);

        cart.remove_item(
            &SessionContext::anonymous(),
            &CartItemId::new("mock-item-1"),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(cart.totals().subtotal, Amount::new(150_000));
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_quantity_rejected() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        cart.clear_error();
        let id = CartItemId::new("mock-item-1");

        let outcome = cart
            .update_quantity(
                &SessionContext::anonymous(),
                &id,
                5_000_000_000,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(outcome, MutationOutcome::Rejected { .. }));
        assert_eq!(cart.items(), fallback::mock_cart_items().as_slice());
        assert_eq!(cart.error(), outcome.error());
    }

    #[tokio::test]
    async fn test_item_count_does_not_overflow() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        let max = i64::from(u32::MAX);
        let ctx = SessionContext::anonymous();
        let cancel = CancellationToken::new();

        cart.update_quantity(&ctx, &CartItemId::new("mock-item-1"), max, &cancel)
            .await;
        cart.update_quantity(&ctx, &CartItemId::new("mock-item-2"), max, &cancel)
            .await;

        assert_eq!(cart.item_count(), 2 * u64::from(u32::MAX));
        assert_eq!(cart.totals().shipping, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_add_zero_quantity_rejected() {
        let mut cart = client(MutationPolicy::Optimistic, FallbackPolicy::MockCart);
        let outcome = cart
            .add_item(
                &SessionContext::anonymous(),
                &ProductId::new("p-1"),
                0,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(outcome, MutationOutcome::Rejected { .. }));
        assert_eq!(cart.source(), CartSource::Unloaded);
        assert_eq!(cart.error(), Some("Quantity must be at least 1."));
    }

    #[tokio::test]
    async fn test_add_item_failure_keeps_items() {
        let mut cart = loaded(MutationPolicy::Optimistic).await;
        let outcome = cart
            .add_item(
                &SessionContext::anonymous(),
                &ProductId::new("p-1"),
                1,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(outcome, MutationOutcome::RolledBack { .. }));
        assert_eq!(cart.items(), fallback::mock_cart_items().as_slice());
        assert_eq!(cart.error(), Some(Operation::AddItem.failure_message()));
    }
}
