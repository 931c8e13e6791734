//! Product listing.

use shopfront_client::{CatalogFetcher, CatalogSource};
use tokio_util::sync::CancellationToken;

use super::{CommandContext, CommandError};

/// List a page of products. Falls back to the featured list when the
/// backend cannot be reached.
///
/// # Errors
///
/// Returns `CommandError::Cancelled` if interrupted.
pub async fn list(
    ctx: &CommandContext,
    limit: Option<u32>,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    let limit = limit.unwrap_or(ctx.config.product_limit);
    let fetcher = CatalogFetcher::new(ctx.api.clone());

    let page = fetcher
        .load(limit, cancel)
        .await
        .ok_or(CommandError::Cancelled)?;

    if page.source == CatalogSource::Fallback
        && let Some(error) = &page.error
    {
        tracing::warn!("{error}");
    }

    for product in &page.products {
        tracing::info!(
            product_id = %product.id,
            price = %product.price,
            category = %product.category,
            "{}",
            product.title
        );
    }
    tracing::info!(count = page.products.len(), source = ?page.source, "Products listed");

    Ok(())
}
