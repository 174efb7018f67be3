//! Hosted backend adapter: identity over the auth endpoint, profile rows
//! over the REST endpoint, and the on-disk session cache.
//!
//! ARCHITECTURE
//! ============
//! One `reqwest::Client` is shared by both adapters. The current session
//! lives in a [`SessionCell`] that the identity adapter writes and the
//! profile store reads for its bearer token.

pub mod auth;
pub mod rest;
pub mod storage;

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::{BackendConfig, ConfigError, HttpTimeouts};
use crate::identity::Session;

pub use auth::HttpIdentity;
pub use rest::HttpProfileStore;
pub use storage::SessionFile;

// =============================================================================
// BACKEND
// =============================================================================

/// Both backend adapters, wired to the same client and session.
pub struct Backend {
    pub identity: Arc<HttpIdentity>,
    pub profiles: Arc<HttpProfileStore>,
}

impl Backend {
    /// Build the HTTP client and adapters. A session cached in
    /// `session_file` is loaded so startup restore can pick it up.
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClientBuild`] when the client cannot be constructed.
    pub fn connect(config: &BackendConfig, session_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let http = build_http(config.timeouts)?;
        let endpoint = Endpoint { base: config.url.clone(), anon_key: config.anon_key.clone() };
        let file = session_file.map(SessionFile::new);
        let cell = SessionCell::new(file.as_ref().and_then(SessionFile::load));

        let identity = HttpIdentity::new(http.clone(), endpoint.clone(), cell.clone(), file);
        let profiles = HttpProfileStore::new(http, endpoint, cell);
        tracing::debug!(url = %config.url, "backend adapters ready");
        Ok(Self { identity: Arc::new(identity), profiles: Arc::new(profiles) })
    }
}

fn build_http(timeouts: HttpTimeouts) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))
}

// =============================================================================
// SHARED
// =============================================================================

/// Project base URL plus the public key every request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base: String,
    pub anon_key: String,
}

impl Endpoint {
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Bearer token for a request: the session's access token, else the anon key.
    #[must_use]
    pub fn bearer(&self, session: Option<&Session>) -> String {
        let token = session.map_or(self.anon_key.as_str(), |s| s.access_token.as_str());
        format!("Bearer {token}")
    }
}

/// Current session shared between adapters.
#[derive(Debug, Clone, Default)]
pub struct SessionCell {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionCell {
    #[must_use]
    pub fn new(session: Option<Session>) -> Self {
        Self { inner: Arc::new(RwLock::new(session)) }
    }

    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, session: Option<Session>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
