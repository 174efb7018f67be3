//! Identity service over the hosted auth endpoint (`/auth/v1`).
//!
//! Thin HTTP wrapper. Response parsing lives in pure functions
//! (`parse_token_response`, `error_message`) for testability.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::storage::SessionFile;
use super::{Endpoint, SessionCell};
use crate::identity::{
    AuthEvent, AuthEventHub, AuthSubscription, AuthUser, IdentityError, IdentityService, Session, SignUpMetadata,
    unix_now,
};

const PASSWORD_GRANT_PATH: &str = "/auth/v1/token?grant_type=password";
const REFRESH_GRANT_PATH: &str = "/auth/v1/token?grant_type=refresh_token";
const SIGNUP_PATH: &str = "/auth/v1/signup";
const LOGOUT_PATH: &str = "/auth/v1/logout";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpIdentity {
    http: reqwest::Client,
    endpoint: Endpoint,
    session: SessionCell,
    file: Option<SessionFile>,
    hub: AuthEventHub,
}

impl HttpIdentity {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: Endpoint, session: SessionCell, file: Option<SessionFile>) -> Self {
        Self { http, endpoint, session, file, hub: AuthEventHub::new() }
    }

    /// Session currently held, without refreshing.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.session.get()
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&Session>,
    ) -> Result<(u16, String), IdentityError> {
        let response = self
            .http
            .post(self.endpoint.url(path))
            .header("apikey", &self.endpoint.anon_key)
            .header("Authorization", self.endpoint.bearer(bearer))
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        Ok((status, text))
    }

    async fn refresh(&self, stale: &Session) -> Result<Option<Session>, IdentityError> {
        let body = RefreshRequest { refresh_token: &stale.refresh_token };
        let (status, text) = self.post_json(REFRESH_GRANT_PATH, &body, None).await?;

        if (400..500).contains(&status) {
            warn!(user_id = %stale.user_id(), status, "session refresh refused; signing out");
            self.store(None);
            self.hub.emit(AuthEvent::SignedOut, None);
            return Ok(None);
        }
        if !is_success(status) {
            return Err(rejected(status, &text));
        }

        let session = parse_token_response(&text, unix_now())?;
        debug!(user_id = %session.user_id(), "session refreshed");
        self.store(Some(session.clone()));
        self.hub.emit(AuthEvent::TokenRefreshed, Some(session.clone()));
        Ok(Some(session))
    }

    fn store(&self, session: Option<Session>) {
        if let Some(file) = &self.file {
            let result = match &session {
                Some(s) => file.save(s),
                None => file.clear(),
            };
            if let Err(e) = result {
                warn!(path = %file.path().display(), error = %e, "session file update failed");
            }
        }
        self.session.set(session);
    }
}

#[async_trait::async_trait]
impl IdentityService for HttpIdentity {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let Some(session) = self.session.get() else {
            return Ok(None);
        };
        if !session.is_expired_at(unix_now()) {
            return Ok(Some(session));
        }
        self.refresh(&session).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let body = PasswordRequest { email, password };
        let (status, text) = self.post_json(PASSWORD_GRANT_PATH, &body, None).await?;

        if matches!(status, 400 | 401 | 422) {
            debug!(status, message = %error_message(&text), "password grant refused");
            return Err(IdentityError::InvalidCredentials);
        }
        if !is_success(status) {
            return Err(rejected(status, &text));
        }

        let session = parse_token_response(&text, unix_now())?;
        self.store(Some(session.clone()));
        self.hub.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: &SignUpMetadata) -> Result<(), IdentityError> {
        let body = SignUpBody { email, password, data: metadata };
        let (status, text) = self.post_json(SIGNUP_PATH, &body, None).await?;
        if !is_success(status) {
            return Err(rejected(status, &text));
        }
        info!(email, "identity account registered");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Some(session) = self.session.get() else {
            return Ok(());
        };
        self.store(None);
        self.hub.emit(AuthEvent::SignedOut, None);

        let (status, text) = self
            .post_json(LOGOUT_PATH, &serde_json::json!({}), Some(&session))
            .await?;
        // 401/404: the token is already invalid remotely.
        if is_success(status) || matches!(status, 401 | 404) {
            return Ok(());
        }
        Err(rejected(status, &text))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.hub.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SignUpMetadata,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a token-grant response into a session. Without an absolute
/// `expires_at`, expiry is derived from `expires_in` relative to `now_unix`.
///
/// # Errors
///
/// [`IdentityError::Decode`] when the body is not a token response.
pub fn parse_token_response(json: &str, now_unix: i64) -> Result<Session, IdentityError> {
    let raw: TokenResponse = serde_json::from_str(json).map_err(|e| IdentityError::Decode(e.to_string()))?;
    let expires_at = raw
        .expires_at
        .or_else(|| raw.expires_in.map(|secs| now_unix.saturating_add(secs)));
    Ok(Session { access_token: raw.access_token, refresh_token: raw.refresh_token, expires_at, user: raw.user })
}

/// Human-readable message from an auth error body, falling back to the raw text.
#[must_use]
pub fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .msg
        .or(parsed.error_description)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_owned())
}

fn rejected(status: u16, body: &str) -> IdentityError {
    IdentityError::Rejected { status, message: error_message(body) }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
