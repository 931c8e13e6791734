//! Order placement.

use shopfront_client::checkout::{Checkout, CheckoutPhase, PaymentMethod, PlaceOrderOutcome};
use shopfront_core::AddressId;
use tokio_util::sync::CancellationToken;

use super::{CommandContext, CommandError, log_cart};

/// Choices made on the command line.
#[derive(Debug)]
pub struct CheckoutOptions {
    pub address: Option<AddressId>,
    pub payment: PaymentMethod,
    pub notes: Option<String>,
}

/// Load the checkout, apply `options` and place the order.
///
/// # Errors
///
/// Returns an error for a failed precondition, a missing login, a failed
/// request or an interrupt.
pub async fn place(
    ctx: &CommandContext,
    options: CheckoutOptions,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    let session = ctx.session()?;
    let mut checkout = Checkout::new(ctx.api.clone(), ctx.cart_client());

    if checkout.load(&session, cancel).await != CheckoutPhase::Ready {
        return Err(CommandError::Cancelled);
    }
    if let Some(error) = checkout.error() {
        tracing::warn!("{error}");
    }

    for address in checkout.addresses() {
        tracing::info!(
            address_id = %address.id,
            default = address.is_default,
            "{}: {}, {}",
            address.title,
            address.street,
            address.city
        );
    }

    if let Some(id) = &options.address {
        checkout.select_address(id)?;
    }
    checkout.set_payment_method(options.payment);
    if let Some(notes) = options.notes {
        checkout.set_notes(notes);
    }

    log_cart(checkout.cart());

    match checkout.place_order(&session, cancel).await {
        PlaceOrderOutcome::Placed { order_id, redirect } => {
            tracing::info!(order_id = %order_id, "Order placed, see {redirect}");
            Ok(())
        }
        PlaceOrderOutcome::LoginRequired { return_to } => {
            Err(CommandError::LoginRequired { return_to })
        }
        PlaceOrderOutcome::Rejected(e) => Err(e.into()),
        PlaceOrderOutcome::Failed { error } => Err(CommandError::Failed(error)),
        PlaceOrderOutcome::Cancelled => Err(CommandError::Cancelled),
    }
}
