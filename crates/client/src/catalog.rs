//! Product catalog fetcher.
//!
//! Requests a bounded page of products with a single attempt (no retry, no
//! backoff). When that fails, [`CatalogFetcher::load`] substitutes the fixed
//! fallback list so a listing never renders empty because the backend is
//! down. Live pages are cached in memory via `moka` (5 minute TTL); fallback
//! pages are never cached.

use std::time::Duration;

use moka::future::Cache;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::api::{ApiClient, ApiError};
use crate::error::{Operation, report};
use crate::fallback;
use crate::types::Product;

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 64;

/// Where a catalog page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Fetched from the server just now.
    Live,
    /// Served from the in-memory cache.
    Cached,
    /// Substituted after a failed fetch.
    Fallback,
}

/// A page of products ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub source: CatalogSource,
    /// User-facing error when `source` is `Fallback`.
    pub error: Option<String>,
}

/// Fetches product pages with caching and fallback.
#[derive(Clone)]
pub struct CatalogFetcher {
    api: ApiClient,
    cache: Cache<u32, Vec<Product>>,
}

impl CatalogFetcher {
    /// Create a fetcher with the default cache TTL.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self::with_ttl(api, CACHE_TTL)
    }

    /// Create a fetcher with a custom cache TTL.
    #[must_use]
    pub fn with_ttl(api: ApiClient, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { api, cache }
    }

    /// Fetch a page of products from the server, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns the underlying API error on any failure.
    pub async fn fetch(
        &self,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, ApiError> {
        self.api.list_products(limit, cancel).await
    }

    /// Load a page of products for display.
    ///
    /// Returns `None` only when cancelled.
    #[instrument(skip(self, cancel))]
    pub async fn load(&self, limit: u32, cancel: &CancellationToken) -> Option<CatalogPage> {
        if let Some(products) = self.cache.get(&limit).await {
            debug!("Cache hit for product page");
            return Some(CatalogPage {
                products,
                source: CatalogSource::Cached,
                error: None,
            });
        }

        match self.fetch(limit, cancel).await {
            Ok(products) => {
                self.cache.insert(limit, products.clone()).await;
                Some(CatalogPage {
                    products,
                    source: CatalogSource::Live,
                    error: None,
                })
            }
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(CatalogPage {
                products: fallback::fallback_products(),
                source: CatalogSource::Fallback,
                error: Some(report(Operation::FetchProducts, &e)),
            }),
        }
    }

    /// Drop all cached pages.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn fetcher() -> CatalogFetcher {
        let config = ClientConfig::new("http://127.0.0.1:9/").unwrap();
        CatalogFetcher::new(ApiClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_failure_substitutes_fallback() {
        let page = fetcher().load(12, &CancellationToken::new()).await.unwrap();
        assert_eq!(page.source, CatalogSource::Fallback);
        assert_eq!(page.products, fallback::fallback_products());
        assert_eq!(
            page.error.as_deref(),
            Some(Operation::FetchProducts.failure_message())
        );
    }

    #[tokio::test]
    async fn test_fallback_is_not_cached() {
        let fetcher = fetcher();
        fetcher.load(12, &CancellationToken::new()).await.unwrap();
        fetcher.cache.run_pending_tasks().await;
        assert_eq!(fetcher.cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_load() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(fetcher().load(12, &cancel).await.is_none());
    }
}
