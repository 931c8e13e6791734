//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_API_BASE_URL` - Base URL of the storefront REST API
//!
//! ## Optional
//! - `SHOPFRONT_SESSION_FILE` - Persisted session path (default: .shopfront/session.json)
//! - `SHOPFRONT_BEARER_TOKEN` - Bearer token overriding the persisted one
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SHOPFRONT_PRODUCT_LIMIT` - Catalog page size (default: 12)
//! - `SHOPFRONT_MUTATION_POLICY` - `optimistic` or `rollback` (default: optimistic)
//! - `SHOPFRONT_CART_FALLBACK` - `mock` or `empty` (default: mock)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::{FallbackPolicy, MutationPolicy};

const DEFAULT_SESSION_FILE: &str = ".shopfront/session.json";
const DEFAULT_TIMEOUT_SECS: &str = "10";
const DEFAULT_PRODUCT_LIMIT: &str = "12";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shopfront client configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, always ending in `/`
    pub api_base_url: Url,
    /// Where the bearer and guest tokens are persisted
    pub session_file: PathBuf,
    /// Bearer token from the environment, takes precedence over the persisted one
    pub bearer_token: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Number of products requested for a catalog page
    pub product_limit: u32,
    /// Local state handling when a cart mutation fails
    pub mutation_policy: MutationPolicy,
    /// What a cart load shows when the fetch fails
    pub cart_fallback: FallbackPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("session_file", &self.session_file)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("product_limit", &self.product_limit)
            .field("mutation_policy", &self.mutation_policy)
            .field("cart_fallback", &self.cart_fallback)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration for `base_url` with every optional setting at
    /// its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Self::from_vars(|key| (key == "SHOPFRONT_API_BASE_URL").then(|| base_url.to_string()))
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(&get_required(&get, "SHOPFRONT_API_BASE_URL")?)?;
        let session_file = PathBuf::from(get_or_default(
            &get,
            "SHOPFRONT_SESSION_FILE",
            DEFAULT_SESSION_FILE,
        ));
        let bearer_token = get("SHOPFRONT_BEARER_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        let timeout_secs = parse_var::<u64>(
            "SHOPFRONT_REQUEST_TIMEOUT_SECS",
            &get_or_default(&get, "SHOPFRONT_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        )?;
        let product_limit = parse_var::<u32>(
            "SHOPFRONT_PRODUCT_LIMIT",
            &get_or_default(&get, "SHOPFRONT_PRODUCT_LIMIT", DEFAULT_PRODUCT_LIMIT),
        )?;
        let mutation_policy = parse_var::<MutationPolicy>(
            "SHOPFRONT_MUTATION_POLICY",
            &get_or_default(&get, "SHOPFRONT_MUTATION_POLICY", "optimistic"),
        )?;
        let cart_fallback = parse_var::<FallbackPolicy>(
            "SHOPFRONT_CART_FALLBACK",
            &get_or_default(&get, "SHOPFRONT_CART_FALLBACK", "mock"),
        )?;

        Ok(Self {
            api_base_url,
            session_file,
            bearer_token,
            request_timeout: Duration::from_secs(timeout_secs),
            product_limit,
            mutation_policy,
            cart_fallback,
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_or_default(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable's value, naming the variable in the error.
fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base URL, ensuring relative joins keep its full path.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim()).map_err(|e| {
        ConfigError::InvalidEnvVar("SHOPFRONT_API_BASE_URL".to_string(), e.to_string())
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPFRONT_API_BASE_URL".to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
