//! Checkout orchestration.
//!
//! # Phases
//!
//! ```text
//! Loading --load--> Ready --place_order--> Submitting --ok--> Succeeded
//!                     ^                        |
//!                     +-------- error ---------+
//! ```
//!
//! Saved addresses are only requested with a bearer token. Order placement
//! checks its preconditions locally and issues no request when one fails.
//! A failed submission leaves the checkout `Ready` so the user can retry;
//! retries are not idempotent, the backend may create a second order if the
//! first request reached it.

use std::str::FromStr;
use std::sync::Arc;

use shopfront_core::{AddressId, CartId, CartTotals, OrderId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::api::ApiClient;
use crate::cart::{CartClient, CartLoad};
use crate::error::{Operation, report};
use crate::session::{SessionContext, SessionStore};
use crate::types::Address;

/// Where a user without a bearer token is sent back to after login.
pub const CHECKOUT_PATH: &str = "/checkout";

/// Checkout precondition failures. None of these issue a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// No server cart is loaded (never loaded, or showing fallback data).
    #[error("Your cart could not be loaded, so there is nothing to order yet.")]
    MissingCart,

    /// Saved addresses exist but none is selected.
    #[error("Please choose a shipping address.")]
    AddressRequired,

    /// The chosen address is not one of the saved addresses.
    #[error("Unknown address: {0}")]
    UnknownAddress(AddressId),

    /// This checkout already produced an order.
    #[error("This order has already been placed.")]
    AlreadyPlaced,
}

/// Error parsing a payment method name.
#[derive(Debug, Clone, Error)]
#[error("unknown payment method '{0}'")]
pub struct ParsePaymentMethodError(String);

/// Checkout lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    #[default]
    Loading,
    Ready,
    Submitting,
    Succeeded,
}

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    #[default]
    Online,
    CashOnDelivery,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParsePaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "cod" | "cash" | "cash_on_delivery" | "cash-on-delivery" => Ok(Self::CashOnDelivery),
            other => Err(ParsePaymentMethodError(other.to_string())),
        }
    }
}

/// Result of [`Checkout::place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderOutcome {
    /// The order exists; navigate to its confirmation.
    Placed { order_id: OrderId, redirect: String },
    /// No bearer token; send the user to login and back.
    LoginRequired { return_to: String },
    /// A precondition failed; no request was made.
    Rejected(CheckoutError),
    /// The request failed; the checkout is `Ready` again.
    Failed { error: String },
    /// The request was cancelled; the checkout is `Ready` again.
    Cancelled,
}

/// Confirmation page for a placed order.
#[must_use]
pub fn confirmation_path(order_id: &OrderId) -> String {
    format!("/order-confirmation/{order_id}")
}

/// A checkout in progress.
pub struct Checkout {
    api: ApiClient,
    cart: CartClient,
    store: Arc<dyn SessionStore>,
    phase: CheckoutPhase,
    addresses: Vec<Address>,
    selected_address: Option<AddressId>,
    payment_method: PaymentMethod,
    notes: String,
    error: Option<String>,
    placed_order: Option<OrderId>,
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("cart", &self.cart)
            .field("phase", &self.phase)
            .field("addresses", &self.addresses)
            .field("selected_address", &self.selected_address)
            .field("payment_method", &self.payment_method)
            .field("error", &self.error)
            .field("placed_order", &self.placed_order)
            .finish_non_exhaustive()
    }
}

impl Checkout {
    /// Start a checkout over `cart`. The guest token is cleared from the
    /// cart's session store once an order is placed.
    #[must_use]
    pub fn new(api: ApiClient, cart: CartClient) -> Self {
        let store = Arc::clone(cart.store());
        Self {
            api,
            cart,
            store,
            phase: CheckoutPhase::Loading,
            addresses: Vec::new(),
            selected_address: None,
            payment_method: PaymentMethod::default(),
            notes: String::new(),
            error: None,
            placed_order: None,
        }
    }

    /// Load the cart and, when authenticated, the saved addresses.
    ///
    /// Returns the phase afterwards: `Ready`, or unchanged if cancelled.
    /// A placed order is terminal: loading again does nothing.
    #[instrument(skip_all)]
    pub async fn load(&mut self, ctx: &SessionContext, cancel: &CancellationToken) -> CheckoutPhase {
        if self.phase == CheckoutPhase::Succeeded {
            debug!("Order already placed; not reloading");
            return self.phase;
        }
        if self.cart.load(ctx, cancel).await == CartLoad::Cancelled {
            return self.phase;
        }
        self.error = self.cart.error().map(str::to_string);

        if ctx.is_authenticated() {
            match self.api.list_addresses(ctx, cancel).await {
                Ok(addresses) => {
                    self.selected_address = addresses
                        .iter()
                        .find(|a| a.is_default)
                        .map(|a| a.id.clone());
                    self.addresses = addresses;
                }
                Err(e) if e.is_cancelled() => return self.phase,
                Err(e) => {
                    self.addresses.clear();
                    self.selected_address = None;
                    self.error = Some(report(Operation::LoadAddresses, &e));
                }
            }
        } else {
            debug!("Skipping address load without a bearer token");
        }

        self.phase = CheckoutPhase::Ready;
        self.phase
    }

    /// Choose a saved address.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownAddress` if `id` is not a saved address.
    pub fn select_address(&mut self, id: &AddressId) -> Result<(), CheckoutError> {
        if !self.addresses.iter().any(|a| &a.id == id) {
            return Err(CheckoutError::UnknownAddress(id.clone()));
        }
        self.selected_address = Some(id.clone());
        Ok(())
    }

    pub const fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Submit the order for the loaded cart.
    #[instrument(skip(self, ctx, cancel), fields(payment_method = %self.payment_method))]
    pub async fn place_order(
        &mut self,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> PlaceOrderOutcome {
        let cart_id = match self.check_preconditions() {
            Ok(cart_id) => cart_id,
            Err(e) => {
                self.error = Some(e.to_string());
                return PlaceOrderOutcome::Rejected(e);
            }
        };

        if !ctx.is_authenticated() {
            info!("Order placement requires login");
            return PlaceOrderOutcome::LoginRequired {
                return_to: CHECKOUT_PATH.to_string(),
            };
        }

        self.phase = CheckoutPhase::Submitting;
        self.error = None;

        match self.api.create_order(ctx, &cart_id, cancel).await {
            Ok(order) => {
                if let Err(e) = self.store.clear_guest_token() {
                    tracing::warn!(error = %e, "Failed to clear guest token after order");
                }
                info!(order_id = %order.id, notes = !self.notes.is_empty(), "Order placed");

                self.phase = CheckoutPhase::Succeeded;
                self.placed_order = Some(order.id.clone());
                PlaceOrderOutcome::Placed {
                    redirect: confirmation_path(&order.id),
                    order_id: order.id,
                }
            }
            Err(e) if e.is_cancelled() => {
                self.phase = CheckoutPhase::Ready;
                PlaceOrderOutcome::Cancelled
            }
            Err(e) => {
                let error = report(Operation::PlaceOrder, &e);
                self.phase = CheckoutPhase::Ready;
                self.error = Some(error.clone());
                PlaceOrderOutcome::Failed { error }
            }
        }
    }

    /// The cart to order, if the checkout can be submitted.
    fn check_preconditions(&self) -> Result<CartId, CheckoutError> {
        if self.phase == CheckoutPhase::Succeeded {
            return Err(CheckoutError::AlreadyPlaced);
        }
        let cart_id = self.cart.cart_id().cloned().ok_or(CheckoutError::MissingCart)?;
        if !self.addresses.is_empty() && self.selected_address.is_none() {
            return Err(CheckoutError::AddressRequired);
        }
        Ok(cart_id)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    /// The cart being checked out.
    #[must_use]
    pub const fn cart(&self) -> &CartClient {
        &self.cart
    }

    /// The cart being checked out, for quantity edits on the checkout page.
    pub const fn cart_mut(&mut self) -> &mut CartClient {
        &mut self.cart
    }

    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    #[must_use]
    pub const fn selected_address(&self) -> Option<&AddressId> {
        self.selected_address.as_ref()
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// The last user-facing error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The order this checkout produced, once `Succeeded`.
    #[must_use]
    pub const fn placed_order(&self) -> Option<&OrderId> {
        self.placed_order.as_ref()
    }

    /// Pricing for the cart being checked out.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::cart::{FallbackPolicy, MutationPolicy};
    use crate::config::ClientConfig;
    use crate::session::MemorySessionStore;

    fn checkout() -> Checkout {
        let config = ClientConfig::new("http://127.0.0.1:9/").unwrap();
        let api = ApiClient::new(&config).unwrap();
        let cart = CartClient::new(
            api.clone(),
            Arc::new(MemorySessionStore::default()),
            MutationPolicy::Optimistic,
            FallbackPolicy::MockCart,
        );
        Checkout::new(api, cart)
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::CashOnDelivery);
        assert_eq!("online".parse::<PaymentMethod>().unwrap(), PaymentMethod::Online);
        assert!("barter".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_confirmation_path() {
        assert_eq!(confirmation_path(&OrderId::new("77")), "/order-confirmation/77");
    }

    #[tokio::test]
    async fn test_guest_load_skips_addresses() {
        let mut checkout = checkout();
        let phase = checkout
            .load(&SessionContext::anonymous(), &CancellationToken::new())
            .await;

        assert_eq!(phase, CheckoutPhase::Ready);
        assert!(checkout.addresses().is_empty());
        // Cart fell back, so the cart error is surfaced
        assert_eq!(checkout.error(), Some(Operation::FetchCart.failure_message()));
    }

    #[tokio::test]
    async fn test_place_order_without_cart_id_is_rejected() {
        let mut checkout = checkout();
        checkout
            .load(&SessionContext::anonymous(), &CancellationToken::new())
            .await;

        let ctx = SessionContext::new(Some(SecretString::from("t")), None);
        let outcome = checkout.place_order(&ctx, &CancellationToken::new()).await;

        assert_eq!(outcome, PlaceOrderOutcome::Rejected(CheckoutError::MissingCart));
        assert_eq!(checkout.phase(), CheckoutPhase::Ready);
        assert_eq!(checkout.error(), Some(CheckoutError::MissingCart.to_string().as_str()));
    }

    #[tokio::test]
    async fn test_cancelled_load_keeps_phase() {
        let mut checkout = checkout();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let phase = checkout.load(&SessionContext::anonymous(), &cancel).await;
        assert_eq!(phase, CheckoutPhase::Loading);
        assert!(checkout.cart().items().is_empty());
    }

    #[test]
    fn test_select_unknown_address() {
        let mut checkout = checkout();
        let err = checkout.select_address(&AddressId::new("9")).unwrap_err();
        assert_eq!(err, CheckoutError::UnknownAddress(AddressId::new("9")));
        assert!(checkout.selected_address().is_none());
    }

    #[test]
    fn test_collects_payment_and_notes() {
        let mut checkout = checkout();
        checkout.set_payment_method(PaymentMethod::CashOnDelivery);
        checkout.set_notes("Leave at the door");
        assert_eq!(checkout.payment_method(), PaymentMethod::CashOnDelivery);
        assert_eq!(checkout.notes(), "Leave at the door");
    }
}
