//! Cart commands.
//!
//! Every command loads the cart first so edits apply to the server's view
//! of it, then logs the resulting lines and totals.

use shopfront_client::{CartClient, CartLoad, MutationOutcome, SessionContext};
use shopfront_core::{CartItemId, ProductId};
use tokio_util::sync::CancellationToken;

use super::{CommandContext, CommandError, log_cart};

/// Show the cart.
///
/// # Errors
///
/// Returns an error if the session file is unreadable or the load is
/// cancelled.
pub async fn show(ctx: &CommandContext, cancel: &CancellationToken) -> Result<(), CommandError> {
    let session = ctx.session()?;
    let cart = loaded_cart(ctx, &session, cancel).await?;
    log_cart(&cart);
    Ok(())
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the product could not be added.
pub async fn add(
    ctx: &CommandContext,
    product_id: &ProductId,
    quantity: u32,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    let session = ctx.session()?;
    let mut cart = loaded_cart(ctx, &session, cancel).await?;

    let outcome = cart.add_item(&session, product_id, quantity, cancel).await;
    finish(&cart, outcome)
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the server rejected the change.
pub async fn update(
    ctx: &CommandContext,
    item_id: &CartItemId,
    quantity: i64,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    let session = ctx.session()?;
    let mut cart = loaded_cart(ctx, &session, cancel).await?;

    let outcome = cart
        .update_quantity(&session, item_id, quantity, cancel)
        .await;
    finish(&cart, outcome)
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the server rejected the removal.
pub async fn remove(
    ctx: &CommandContext,
    item_id: &CartItemId,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    let session = ctx.session()?;
    let mut cart = loaded_cart(ctx, &session, cancel).await?;

    let outcome = cart.remove_item(&session, item_id, cancel).await;
    finish(&cart, outcome)
}

async fn loaded_cart(
    ctx: &CommandContext,
    session: &SessionContext,
    cancel: &CancellationToken,
) -> Result<CartClient, CommandError> {
    let mut cart = ctx.cart_client();
    match cart.load(session, cancel).await {
        CartLoad::Live => {}
        CartLoad::Fallback { error } => tracing::warn!("{error}"),
        CartLoad::Cancelled => return Err(CommandError::Cancelled),
    }
    Ok(cart)
}

fn finish(cart: &CartClient, outcome: MutationOutcome) -> Result<(), CommandError> {
    log_cart(cart);
    match outcome {
        MutationOutcome::Confirmed => Ok(()),
        MutationOutcome::Diverged { error }
        | MutationOutcome::RolledBack { error }
        | MutationOutcome::Rejected { error } => Err(CommandError::Failed(error)),
        MutationOutcome::Cancelled => Err(CommandError::Cancelled),
    }
}
