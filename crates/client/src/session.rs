//! Session identity: bearer token, guest token, and where they persist.
//!
//! Identity is never read ad hoc. Each operation takes a [`SessionContext`]
//! snapshot, usually produced once by [`SessionStore::context`], and every
//! request derives its credentials from that snapshot alone.
//!
//! # Invariants
//!
//! - At most one guest token is persisted per client. Once a guest token is
//!   stored, [`SessionStore::remember_guest_token`] will not replace it.
//! - A bearer token always takes precedence over a guest token.

use std::path::PathBuf;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use shopfront_core::GuestToken;
use thiserror::Error;

/// Errors reading or writing persisted session state.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Reading or writing the session file failed.
    #[error("session file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session file is not valid JSON.
    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    /// A previous holder of the in-memory lock panicked.
    #[error("session store lock poisoned")]
    Poisoned,
}

/// The credential a request will be made with.
#[derive(Debug, Clone, Copy)]
pub enum Identity<'a> {
    /// An authenticated customer.
    Bearer(&'a SecretString),
    /// An anonymous visitor with a server-issued cart identity.
    Guest(&'a GuestToken),
    /// An anonymous visitor the server has not seen yet.
    Anonymous,
}

/// Snapshot of the client's identity for a single operation.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    bearer: Option<SecretString>,
    guest_token: Option<GuestToken>,
}

impl SessionContext {
    /// Create a context from explicit tokens.
    #[must_use]
    pub const fn new(bearer: Option<SecretString>, guest_token: Option<GuestToken>) -> Self {
        Self {
            bearer,
            guest_token,
        }
    }

    /// A context with no identity at all.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replace the bearer token if `bearer` is `Some`.
    #[must_use]
    pub fn with_bearer_override(mut self, bearer: Option<SecretString>) -> Self {
        if bearer.is_some() {
            self.bearer = bearer;
        }
        self
    }

    /// Resolve which credential applies. The bearer token wins.
    #[must_use]
    pub fn identity(&self) -> Identity<'_> {
        match (&self.bearer, &self.guest_token) {
            (Some(bearer), _) => Identity::Bearer(bearer),
            (None, Some(guest)) => Identity::Guest(guest),
            (None, None) => Identity::Anonymous,
        }
    }

    /// The bearer token, if authenticated.
    #[must_use]
    pub const fn bearer(&self) -> Option<&SecretString> {
        self.bearer.as_ref()
    }

    /// The guest token, if one was issued.
    #[must_use]
    pub const fn guest_token(&self) -> Option<&GuestToken> {
        self.guest_token.as_ref()
    }

    /// Whether a bearer token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }
}

/// Persisted session state, as written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    /// Authenticated session token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Anonymous cart identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<GuestToken>,
}

/// Storage for the client's identity tokens.
pub trait SessionStore: Send + Sync {
    /// Read the persisted state. Missing state is an empty session.
    ///
    /// # Errors
    ///
    /// Returns an error if the state exists but cannot be read.
    fn load(&self) -> Result<StoredSession, SessionStoreError>;

    /// Replace the persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError>;

    /// Take an identity snapshot for one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    fn context(&self) -> Result<SessionContext, SessionStoreError> {
        let stored = self.load()?;
        Ok(SessionContext::new(
            stored.token.map(SecretString::from),
            stored.guest_token,
        ))
    }

    /// Persist a bearer token after login.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or written.
    fn set_bearer_token(&self, token: &SecretString) -> Result<(), SessionStoreError> {
        let mut stored = self.load()?;
        stored.token = Some(token.expose_secret().to_string());
        self.save(&stored)
    }

    /// Forget the bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or written.
    fn clear_bearer_token(&self) -> Result<(), SessionStoreError> {
        let mut stored = self.load()?;
        if stored.token.take().is_some() {
            self.save(&stored)?;
        }
        Ok(())
    }

    /// Persist a server-issued guest token unless one is already stored.
    ///
    /// Returns `true` if the token was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or written.
    fn remember_guest_token(&self, token: &GuestToken) -> Result<bool, SessionStoreError> {
        let mut stored = self.load()?;
        if stored.guest_token.is_some() {
            return Ok(false);
        }
        stored.guest_token = Some(token.clone());
        self.save(&stored)?;
        Ok(true)
    }

    /// Forget the guest token, e.g. once its cart became an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or written.
    fn clear_guest_token(&self) -> Result<(), SessionStoreError> {
        let mut stored = self.load()?;
        if stored.guest_token.take().is_some() {
            self.save(&stored)?;
        }
        Ok(())
    }
}

// =============================================================================
// FileSessionStore
// =============================================================================

/// Session state persisted as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<StoredSession, SessionStoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredSession::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}

// =============================================================================
// MemorySessionStore
// =============================================================================

/// Session state held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<StoredSession>,
}

impl MemorySessionStore {
    /// Create a store with initial state.
    #[must_use]
    pub const fn new(session: StoredSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<StoredSession, SessionStoreError> {
        self.inner
            .lock()
            .map(|s| s.clone())
            .map_err(|_| SessionStoreError::Poisoned)
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        let mut guard = self.inner.lock().map_err(|_| SessionStoreError::Poisoned)?;
        *guard = session.clone();
        Ok(())
    }
}
