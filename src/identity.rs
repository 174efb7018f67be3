//! Identity-service contract: sessions, auth events, subscriptions.
//!
//! ARCHITECTURE
//! ============
//! The identity service issues and validates credentials. This module only
//! describes what the session manager consumes from it; the HTTP adapter
//! lives in `backend::auth`.
//!
//! Auth-state changes are delivered as typed [`SessionChanged`] messages on
//! an unbounded single-consumer queue per subscriber. Dropping the
//! [`AuthSubscription`] unsubscribes; the hub prunes closed queues on the
//! next emit.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::profile::SignUpRole;

/// Seconds before `expires_at` at which a session is already treated as expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 10;

// =============================================================================
// SESSION
// =============================================================================

/// Identity-service account attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Proof of authentication. Opaque beyond the user id and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds; `None` when the provider did not say.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    #[must_use]
    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        self.expires_at
            .is_some_and(|at| now_unix >= at.saturating_sub(EXPIRY_LEEWAY_SECS))
    }
}

/// Current wall-clock time as unix seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One auth-state change as posted to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChanged {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Receiving end of an auth-event subscription.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: mpsc::UnboundedReceiver<SessionChanged>,
}

impl AuthSubscription {
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<SessionChanged>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<SessionChanged> {
        self.rx.recv().await
    }

    /// Stop receiving events.
    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

/// Fan-out of auth events to every live subscriber.
#[derive(Debug, Default)]
pub struct AuthEventHub {
    listeners: Mutex<Vec<mpsc::UnboundedSender<SessionChanged>>>,
}

impl AuthEventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        AuthSubscription::new(rx)
    }

    /// Deliver `event` to all subscribers, dropping the ones that went away.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let change = SessionChanged { event, session };
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(change.clone()).is_ok());
        tracing::debug!(?event, subscribers = listeners.len(), "auth event emitted");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Metadata attached to a new identity account; the backend's provisioning
/// trigger copies it into the profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpMetadata {
    pub name: String,
    pub role: SignUpRole,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The service answered with an error other than bad credentials.
    #[error("identity service rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("identity request failed: {0}")]
    Network(String),

    #[error("identity response parse failed: {0}")]
    Decode(String),
}

/// External system issuing and validating credentials.
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Current session, if any. May refresh an expired one.
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    /// Register a new account. Does not sign in.
    async fn sign_up(&self, email: &str, password: &str, metadata: &SignUpMetadata) -> Result<(), IdentityError>;

    /// Drop the local session and invalidate it remotely.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Start receiving auth-state changes.
    fn subscribe(&self) -> AuthSubscription;
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
