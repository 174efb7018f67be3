//! In-memory identity service and profile store for session tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use uuid::Uuid;

use crate::identity::{
    AuthEvent, AuthEventHub, AuthSubscription, AuthUser, IdentityError, IdentityService, Session, SignUpMetadata,
};
use crate::profile::{ProfileError, ProfileStore, Role, UserProfile, single_row};
use crate::session::state::SessionState;

// =============================================================================
// FIXTURES
// =============================================================================

#[must_use]
pub fn profile(role: Role) -> UserProfile {
    profile_for(Uuid::new_v4(), role)
}

#[must_use]
pub fn profile_for(id: Uuid, role: Role) -> UserProfile {
    UserProfile {
        id,
        email: "a@b.com".into(),
        name: "A".into(),
        role,
        status: Some("active".into()),
        specialty: None,
        phone: None,
        created_at: "2024-05-01T09:30:00+00:00".into(),
    }
}

#[must_use]
pub fn session_for(user_id: Uuid) -> Session {
    Session {
        access_token: format!("access-{user_id}"),
        refresh_token: "refresh".into(),
        expires_at: None,
        user: AuthUser { id: user_id, email: Some("a@b.com".into()) },
    }
}

/// Wait until `pred` holds for the published state, failing after one second.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<SessionState>,
    pred: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session state")
        .expect("session state channel closed")
        .clone()
}

// =============================================================================
// FAKE IDENTITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutBehavior {
    Succeed,
    Fail,
    Hang,
}

/// Identity service that accepts a single password and mirrors the hosted
/// backend's event emission.
pub struct FakeIdentity {
    pub hub: AuthEventHub,
    pub session: Mutex<Option<Session>>,
    pub password: String,
    pub user_id: Uuid,
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub fail_get_session: AtomicBool,
    pub sign_out_behavior: Mutex<SignOutBehavior>,
    pub signed_up: Mutex<Vec<(String, SignUpMetadata)>>,
}

impl FakeIdentity {
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self {
            hub: AuthEventHub::new(),
            session: Mutex::new(None),
            password: "pw123456".into(),
            user_id,
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            fail_get_session: AtomicBool::new(false),
            sign_out_behavior: Mutex::new(SignOutBehavior::Succeed),
            signed_up: Mutex::new(Vec::new()),
        }
    }

    /// Start with a cached session, as after a previous run.
    #[must_use]
    pub fn with_session(self) -> Self {
        *self.session.lock().unwrap() = Some(session_for(self.user_id));
        self
    }

    pub fn set_sign_out_behavior(&self, behavior: SignOutBehavior) {
        *self.sign_out_behavior.lock().unwrap() = behavior;
    }

    /// Push an auth event as the backend would.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        self.hub.emit(event, session);
    }
}

#[async_trait::async_trait]
impl IdentityService for FakeIdentity {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(IdentityError::Network("connection refused".into()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, _email: &str, password: &str) -> Result<Session, IdentityError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if password != self.password {
            return Err(IdentityError::InvalidCredentials);
        }
        let session = session_for(self.user_id);
        *self.session.lock().unwrap() = Some(session.clone());
        self.hub.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str, metadata: &SignUpMetadata) -> Result<(), IdentityError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.signed_up
            .lock()
            .unwrap()
            .push((email.to_owned(), metadata.clone()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        self.hub.emit(AuthEvent::SignedOut, None);
        let behavior = *self.sign_out_behavior.lock().unwrap();
        match behavior {
            SignOutBehavior::Succeed => Ok(()),
            SignOutBehavior::Fail => Err(IdentityError::Network("logout failed".into())),
            SignOutBehavior::Hang => std::future::pending().await,
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        self.hub.subscribe()
    }
}

// =============================================================================
// FAKE PROFILE STORE
// =============================================================================

/// Profile table keyed by id, with knobs for provisioning lag, failures and
/// holding responses until released.
#[derive(Default)]
pub struct FakeProfiles {
    pub rows: Mutex<HashMap<Uuid, Vec<UserProfile>>>,
    /// Answer `NotFound` this many times before consulting `rows`.
    pub provisioning_lag: AtomicU32,
    pub fail_network: AtomicBool,
    pub calls: AtomicUsize,
    /// When set, each fetch waits for a permit before answering.
    pub gate: Option<Arc<Semaphore>>,
}

impl FakeProfiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_row(self, row: UserProfile) -> Self {
        self.insert(row);
        self
    }

    /// Hold every fetch until the returned semaphore receives permits.
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn insert(&self, row: UserProfile) {
        self.rows
            .lock()
            .unwrap()
            .entry(row.id)
            .or_default()
            .push(row);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProfileStore for FakeProfiles {
    async fn fetch_profile(&self, id: Uuid) -> Result<UserProfile, ProfileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("gate closed")
                .forget();
        }
        if self.fail_network.load(Ordering::SeqCst) {
            return Err(ProfileError::Network("connection reset".into()));
        }
        if self
            .provisioning_lag
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProfileError::NotFound);
        }
        let rows = self
            .rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default();
        single_row(rows)
    }
}
