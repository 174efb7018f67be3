//! Backend and session configuration parsed from environment variables.
//!
//! The backend endpoint and anon key are required: without them no session
//! can ever be established, so their absence is a terminal configuration
//! fault rather than a retryable error.

use std::path::PathBuf;
use std::time::Duration;

use crate::session::RetryPolicy;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_FILE: &str = ".detailhub-session.json";

const DEFAULT_SIGNUP_PROFILE_ATTEMPTS: u32 = 5;
const DEFAULT_SIGNUP_PROFILE_RETRY_BASE_MS: u64 = 250;
const DEFAULT_SIGNUP_PROFILE_RETRY_MAX_MS: u64 = 2000;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("missing backend configuration: env var {var} not set")]
    Missing { var: &'static str },

    /// A value is present but unusable.
    #[error("invalid backend configuration: {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    /// The HTTP client could not be constructed from the configuration.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// BACKEND
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Hosted backend endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    pub timeouts: HttpTimeouts,
}

impl BackendConfig {
    /// Build typed backend config from environment variables.
    ///
    /// Required:
    /// - `BACKEND_URL`
    /// - `BACKEND_ANON_KEY`
    ///
    /// Optional:
    /// - `BACKEND_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required variable is absent and
    /// [`ConfigError::Invalid`] when the URL cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = required_env("BACKEND_URL")?;
        let anon_key = required_env("BACKEND_ANON_KEY")?;
        let timeouts = HttpTimeouts {
            request_secs: env_parse("BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("BACKEND_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        Self::new(&url, anon_key, timeouts)
    }

    /// Validate and normalize an explicit endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `url` is not an absolute http(s) URL.
    pub fn new(url: &str, anon_key: String, timeouts: HttpTimeouts) -> Result<Self, ConfigError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| ConfigError::Invalid { var: "BACKEND_URL", reason: e.to_string() })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "BACKEND_URL",
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if anon_key.trim().is_empty() {
            return Err(ConfigError::Missing { var: "BACKEND_ANON_KEY" });
        }
        let url = url.trim().trim_end_matches('/').to_owned();
        Ok(Self { url, anon_key, timeouts })
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Tuning knobs for the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Backoff used when reading the profile row right after sign-up.
    pub signup_profile_retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            signup_profile_retry: RetryPolicy {
                attempts: DEFAULT_SIGNUP_PROFILE_ATTEMPTS,
                base_delay: Duration::from_millis(DEFAULT_SIGNUP_PROFILE_RETRY_BASE_MS),
                max_delay: Duration::from_millis(DEFAULT_SIGNUP_PROFILE_RETRY_MAX_MS),
            },
        }
    }
}

impl SessionSettings {
    /// - `SIGNUP_PROFILE_ATTEMPTS`: default 5 (clamped to at least 1)
    /// - `SIGNUP_PROFILE_RETRY_BASE_MS`: default 250
    /// - `SIGNUP_PROFILE_RETRY_MAX_MS`: default 2000
    #[must_use]
    pub fn from_env() -> Self {
        let attempts = env_parse("SIGNUP_PROFILE_ATTEMPTS", DEFAULT_SIGNUP_PROFILE_ATTEMPTS).max(1);
        let base_ms = env_parse("SIGNUP_PROFILE_RETRY_BASE_MS", DEFAULT_SIGNUP_PROFILE_RETRY_BASE_MS);
        let max_ms = env_parse("SIGNUP_PROFILE_RETRY_MAX_MS", DEFAULT_SIGNUP_PROFILE_RETRY_MAX_MS).max(base_ms);
        Self {
            signup_profile_retry: RetryPolicy {
                attempts,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(max_ms),
            },
        }
    }
}

/// Where the current session is persisted between runs.
#[must_use]
pub fn session_file_from_env() -> PathBuf {
    std::env::var("DETAILHUB_SESSION_FILE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from)
}

// =============================================================================
// HELPERS
// =============================================================================

fn required_env(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { var })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
