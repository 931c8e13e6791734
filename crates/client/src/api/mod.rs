//! REST client for the storefront backend.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, one shared connection pool per [`ApiClient`]
//! - Every response is a `{success, data, message}` envelope (see `wire`)
//! - Identity comes from an explicit [`SessionContext`], never global state
//! - Every call races a [`CancellationToken`] and stops at the first
//!   suspension point after cancellation
//!
//! # Endpoints
//!
//! | Method | Path | Identity |
//! |---|---|---|
//! | `GET` | `/cart[?guestToken=]` | bearer or guest |
//! | `PUT` | `/cart/items/:itemId` | bearer or guest |
//! | `DELETE` | `/cart/items/:itemId` | bearer or guest |
//! | `POST` | `/cart/:cartId/items` | bearer or guest |
//! | `GET` | `/address` | bearer only |
//! | `POST` | `/orders` | bearer only |
//! | `GET` | `/products?limit=N` | none |

mod conversions;
pub mod wire;

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use shopfront_core::{CartId, CartItemId, ProductId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::session::{Identity, SessionContext};
use crate::types::{Address, Cart, PlacedOrder, Product};

use wire::{
    AddItemBody, AddressData, CartData, CreateOrderBody, Envelope, ErrorBody, OrderData,
    ProductData, UpdateQuantityBody,
};

/// Header carrying a per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum response body characters included in logs and errors.
const BODY_PREVIEW_CHARS: usize = 500;

/// Errors that can occur when talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// The envelope reported `success: false` or carried no data.
    #[error("Unsuccessful response: {0}")]
    Unsuccessful(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The endpoint requires a bearer token and none was provided.
    #[error("Authentication required")]
    Unauthenticated,

    /// The configured base URL cannot have paths appended.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The operation was cancelled before it completed.
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Whether this error is a cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
        })
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request with the context's credentials and a request ID.
    fn request(&self, method: Method, url: Url, ctx: &SessionContext) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        let builder = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id);

        match ctx.bearer() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and decode its envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>, ApiError> {
        with_cancel(cancel, async move {
            let response = builder.send().await?;
            let status = response.status();

            // Get response body as text first for better error diagnostics
            let body = response.text().await?;

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.message)
                    .unwrap_or_else(|| preview(&body));
                tracing::warn!(
                    status = %status,
                    body = %preview(&body),
                    "Storefront API returned non-success status"
                );
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            serde_json::from_str::<Envelope<T>>(&body).map_err(|e| {
                tracing::error!(
                    error = %e,
                    body = %preview(&body),
                    "Failed to parse storefront API response"
                );
                ApiError::Parse(e)
            })
        })
        .await
    }

    /// Send a request whose envelope must carry data.
    async fn send_data<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let envelope = self.send::<T>(builder, cancel).await?;
        match envelope {
            Envelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { message, .. } => Err(ApiError::Unsuccessful(
                message.unwrap_or_else(|| "response carried no data".to_string()),
            )),
        }
    }

    /// Send a request where only the envelope's success flag matters.
    async fn send_ack(
        &self,
        builder: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let envelope = self.send::<serde_json::Value>(builder, cancel).await?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Unsuccessful(
                envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the cart for the context's identity.
    ///
    /// A bearer token is sent as `Authorization`; otherwise a guest token is
    /// sent as the `guestToken` query parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the envelope is unsuccessful,
    /// or the operation is cancelled.
    #[instrument(skip(self, ctx, cancel))]
    pub async fn get_cart(
        &self,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> Result<Cart, ApiError> {
        let mut url = self.endpoint(&["cart"])?;
        if let Identity::Guest(token) = ctx.identity() {
            url.query_pairs_mut()
                .append_pair("guestToken", token.as_str());
        }

        let data: CartData = self
            .send_data(self.request(Method::GET, url, ctx), cancel)
            .await?;
        let cart = Cart::from(data);
        debug!(cart_id = %cart.id, items = cart.items.len(), "Fetched cart");
        Ok(cart)
    }

    /// Set a cart line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the envelope is unsuccessful,
    /// or the operation is cancelled.
    #[instrument(skip(self, ctx, cancel), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        ctx: &SessionContext,
        item_id: &CartItemId,
        quantity: u32,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "items", item_id.as_str()])?;
        let builder = self
            .request(Method::PUT, url, ctx)
            .json(&UpdateQuantityBody { quantity });
        self.send_ack(builder, cancel).await
    }

    /// Delete a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the envelope is unsuccessful,
    /// or the operation is cancelled.
    #[instrument(skip(self, ctx, cancel), fields(item_id = %item_id))]
    pub async fn remove_cart_item(
        &self,
        ctx: &SessionContext,
        item_id: &CartItemId,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "items", item_id.as_str()])?;
        self.send_ack(self.request(Method::DELETE, url, ctx), cancel)
            .await
    }

    /// Add a product to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the envelope is unsuccessful,
    /// or the operation is cancelled.
    #[instrument(skip(self, ctx, cancel), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_cart_item(
        &self,
        ctx: &SessionContext,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", cart_id.as_str(), "items"])?;
        let builder = self.request(Method::POST, url, ctx).json(&AddItemBody {
            product_id,
            quantity,
        });
        self.send_ack(builder, cancel).await
    }

    // =========================================================================
    // Address Methods
    // =========================================================================

    /// List the authenticated customer's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a request when the context
    /// has no bearer token, otherwise any request error.
    #[instrument(skip(self, ctx, cancel))]
    pub async fn list_addresses(
        &self,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Address>, ApiError> {
        if !ctx.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }

        let url = self.endpoint(&["address"])?;
        let data: Vec<AddressData> = self
            .send_data(self.request(Method::GET, url, ctx), cancel)
            .await?;
        Ok(data.into_iter().map(Address::from).collect())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Submit an order for a cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a request when the context
    /// has no bearer token, otherwise any request error.
    #[instrument(skip(self, ctx, cancel), fields(cart_id = %cart_id))]
    pub async fn create_order(
        &self,
        ctx: &SessionContext,
        cart_id: &CartId,
        cancel: &CancellationToken,
    ) -> Result<PlacedOrder, ApiError> {
        if !ctx.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }

        let url = self.endpoint(&["orders"])?;
        let builder = self
            .request(Method::POST, url, ctx)
            .json(&CreateOrderBody { cart_id });
        let data: OrderData = self.send_data(builder, cancel).await?;
        Ok(PlacedOrder::from(data))
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Fetch one page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the envelope is unsuccessful,
    /// or the operation is cancelled.
    #[instrument(skip(self, cancel))]
    pub async fn list_products(
        &self,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, ApiError> {
        let mut url = self.endpoint(&["products"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let ctx = SessionContext::anonymous();
        let data: Vec<ProductData> = self
            .send_data(self.request(Method::GET, url, &ctx), cancel)
            .await?;
        Ok(data.into_iter().map(Product::from).collect())
    }
}

/// Race a future against cancellation. Cancellation wins ties.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
