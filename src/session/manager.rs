//! Session manager: owns current-user state for one app instance.
//!
//! ARCHITECTURE
//! ============
//! `SessionManager` is a handle; the state lives in an actor task that is the
//! only writer. The actor consumes two single-consumer queues serially: the
//! manager's own message queue and the identity service's auth-event
//! subscription. Every change is published on a `watch` channel that route
//! guards and screens read.
//!
//! The actor never awaits network I/O. Startup restore and profile fetches
//! run in tracked tasks and post their outcome back as messages tagged with
//! the generation that issued them. Any session-changing message bumps the
//! generation, so an outcome that arrives after a newer change is dropped:
//! the latest request wins, not the slowest response.
//!
//! Interactive calls (`sign_in`, `sign_up`) run on the caller's task so
//! their errors go straight back to the caller. They report begin/end to
//! the actor through [`CallGuard`], which keeps the loading flag owned by
//! the single writer.
//!
//! While a sign-up is in flight its own retried profile read owns the
//! outcome: observer fetch failures for the new account are held back so a
//! row that is still provisioning never surfaces as a fault.
//!
//! TEARDOWN
//! ========
//! `teardown` closes the queue, aborts tracked tasks and unsubscribes from
//! auth events. Outcomes that arrive later find a closed queue and are
//! discarded, so nothing mutates state after teardown.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::errors::{AuthError, Credentials, SignUpRequest};
use super::retry::fetch_profile_with_retry;
use super::state::{SessionFault, SessionPhase, SessionState};
use crate::config::{ConfigError, SessionSettings};
use crate::identity::{AuthSubscription, IdentityService, Session, SessionChanged, SignUpMetadata};
use crate::profile::{ProfileError, ProfileStore, UserProfile};

// =============================================================================
// MESSAGES
// =============================================================================

/// Which path issued a profile fetch; decides how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOrigin {
    Restore,
    Observer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    SignIn,
    SignUp,
}

#[derive(Debug)]
enum Message {
    CallStarted { kind: CallKind },
    CallFinished { kind: CallKind },
    /// Startup restore found no session (or could not ask).
    SessionAbsent { generation: u64 },
    ProfileLoaded {
        generation: u64,
        origin: FetchOrigin,
        user_id: Uuid,
        result: Result<UserProfile, ProfileError>,
    },
    /// Final outcome of the sign-up profile read.
    SignUpSettled { user_id: Uuid, result: Result<UserProfile, ProfileError> },
    SignOut { reply: oneshot::Sender<()> },
    Shutdown,
}

/// Raises the loading flag for as long as it lives.
struct CallGuard {
    tx: mpsc::UnboundedSender<Message>,
    kind: CallKind,
}

impl CallGuard {
    fn start(tx: &mpsc::UnboundedSender<Message>, kind: CallKind) -> Self {
        let _ = tx.send(Message::CallStarted { kind });
        Self { tx: tx.clone(), kind }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::CallFinished { kind: self.kind });
    }
}

// =============================================================================
// HANDLE
// =============================================================================

struct Running {
    identity: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    settings: SessionSettings,
    tx: mpsc::UnboundedSender<Message>,
    actor: JoinHandle<()>,
}

/// Explicitly constructed session manager. Pass it (or its state receiver)
/// to whatever needs the current user.
pub struct SessionManager {
    running: Option<Running>,
    state: watch::Receiver<SessionState>,
}

impl SessionManager {
    /// Start the actor: subscribe to auth events and restore any existing
    /// session. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(
        identity: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileStore>,
        settings: SessionSettings,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = identity.subscribe();

        let actor = Actor {
            identity: Arc::clone(&identity),
            profiles: Arc::clone(&profiles),
            state: state_tx,
            tx: tx.downgrade(),
            tasks: JoinSet::new(),
            generation: 0,
            sign_ups_in_flight: 0,
        };
        let actor = tokio::spawn(actor.run(rx, subscription));

        Self { running: Some(Running { identity, profiles, settings, tx, actor }), state: state_rx }
    }

    /// A manager stuck in the terminal configuration fault. Every interactive
    /// call fails with [`AuthError::Unavailable`].
    #[must_use]
    pub fn unconfigured(error: &ConfigError) -> Self {
        error!(error = %error, "backend not configured; session manager disabled");
        let fault = SessionFault::Configuration(error.to_string());
        let (_, state) = watch::channel(SessionState { phase: SessionPhase::Failed(fault), ..SessionState::default() });
        Self { running: None, state }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Change stream of the session state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until startup restore has reached a resting phase.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.clone();
        match rx.wait_for(SessionState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Verify credentials with the identity service. On success the auth
    /// event it emits makes the actor load the profile; the returned session
    /// tells the caller which user that state will belong to.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingCredentials`] without touching the network when a
    /// field is empty; otherwise the identity failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = Credentials::parse(email, password)?;
        let running = self.running()?;
        let _call = CallGuard::start(&running.tx, CallKind::SignIn);

        let session = running
            .identity
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await
            .inspect_err(|e| warn!(email = %credentials.email, error = %e, "sign-in failed"))?;
        info!(email = %credentials.email, user_id = %session.user_id(), "signed in");
        Ok(session)
    }

    /// Register, sign in, and load the freshly provisioned profile.
    ///
    /// The profile row is written by the backend after registration, so the
    /// read is retried with backoff per `SessionSettings::signup_profile_retry`.
    ///
    /// # Errors
    ///
    /// Validation errors, identity failures, or [`AuthError::ProfileNotFound`]
    /// when the row never appears. A failed profile read also moves the
    /// manager to `ProfileNotFound` (row missing) or `ProfileLoad` (other).
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<UserProfile, AuthError> {
        let (credentials, name) = request.validate()?;
        let running = self.running()?;
        let _call = CallGuard::start(&running.tx, CallKind::SignUp);

        let metadata = SignUpMetadata { name, role: request.role };
        running
            .identity
            .sign_up(&credentials.email, &credentials.password, &metadata)
            .await
            .inspect_err(|e| warn!(email = %credentials.email, error = %e, "sign-up rejected"))?;
        info!(email = %credentials.email, role = ?request.role, "account created");

        running
            .identity
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await?;
        let session = running
            .identity
            .get_session()
            .await?
            .ok_or(AuthError::NoSession)?;

        let user_id = session.user_id();
        let result =
            fetch_profile_with_retry(running.profiles.as_ref(), user_id, running.settings.signup_profile_retry).await;
        let _ = running
            .tx
            .send(Message::SignUpSettled { user_id, result: result.clone() });

        result.map_err(|e| {
            error!(%user_id, error = %e, "profile missing after sign-up");
            AuthError::from(e)
        })
    }

    /// Clear the local session now and invalidate it remotely in the
    /// background. Returns once the local clear is applied.
    pub async fn sign_out(&self) {
        let Some(running) = &self.running else {
            return;
        };
        let (reply, done) = oneshot::channel();
        if running.tx.send(Message::SignOut { reply }).is_ok() {
            let _ = done.await;
        }
    }

    /// Stop the actor and drop the auth-event subscription. No pending
    /// result is applied afterwards.
    pub async fn teardown(mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.tx.send(Message::Shutdown);
        drop(running.tx);
        if let Err(e) = running.actor.await {
            if !e.is_cancelled() {
                error!(error = %e, "session actor panicked");
            }
        }
    }

    fn running(&self) -> Result<&Running, AuthError> {
        match &self.running {
            Some(running) if !running.tx.is_closed() => Ok(running),
            Some(_) => Err(AuthError::Unavailable("session manager stopped".into())),
            None => Err(AuthError::Unavailable(
                self.state()
                    .fault()
                    .map_or_else(|| "not configured".to_owned(), ToString::to_string),
            )),
        }
    }
}

// =============================================================================
// ACTOR
// =============================================================================

struct Actor {
    identity: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    state: watch::Sender<SessionState>,
    /// Weak so that dropping every handle ends the actor.
    tx: mpsc::WeakUnboundedSender<Message>,
    tasks: JoinSet<()>,
    generation: u64,
    /// Sign-ups between `CallStarted` and `CallFinished`.
    sign_ups_in_flight: u32,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>, subscription: AuthSubscription) {
        let mut subscription = Some(subscription);
        self.begin_restore();

        loop {
            tokio::select! {
                maybe_msg = rx.recv() => match maybe_msg {
                    Some(Message::Shutdown) | None => break,
                    Some(msg) => self.handle(msg),
                },
                change = next_change(&mut subscription) => match change {
                    Some(change) => self.on_session_changed(change),
                    None => {
                        warn!("auth event stream closed; session changes will no longer be observed");
                        subscription = None;
                    }
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "session task panicked");
                        }
                    }
                }
            }
        }

        rx.close();
        self.tasks.abort_all();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        info!(generation = self.generation, "session manager stopped");
    }

    fn handle(&mut self, msg: Message) {
        match msg {
            Message::CallStarted { kind } => {
                if kind == CallKind::SignUp {
                    self.sign_ups_in_flight += 1;
                }
                self.state.send_modify(|s| s.pending_calls += 1);
            }
            Message::CallFinished { kind } => {
                if kind == CallKind::SignUp {
                    self.sign_ups_in_flight = self.sign_ups_in_flight.saturating_sub(1);
                }
                self.state
                    .send_modify(|s| s.pending_calls = s.pending_calls.saturating_sub(1));
            }
            Message::SessionAbsent { generation } => {
                if self.is_current(generation) {
                    info!("no stored session; signed out");
                    self.set_phase(SessionPhase::Anonymous, None);
                }
            }
            Message::ProfileLoaded { generation, origin, user_id, result } => {
                if self.is_current(generation) {
                    self.apply_profile(origin, user_id, result);
                }
            }
            Message::SignUpSettled { user_id, result } => {
                self.generation += 1;
                match result {
                    Ok(profile) => {
                        info!(%user_id, role = %profile.role, "session authenticated after sign-up");
                        self.set_phase(SessionPhase::Authenticated(profile), Some(user_id));
                    }
                    Err(e) => {
                        let fault = if e.is_missing() {
                            SessionFault::ProfileNotFound
                        } else {
                            SessionFault::ProfileLoad
                        };
                        warn!(%user_id, error = %e, fault = %fault, "sign-up profile read failed");
                        self.set_phase(SessionPhase::Failed(fault), Some(user_id));
                    }
                }
            }
            Message::SignOut { reply } => self.sign_out(reply),
            Message::Shutdown => {}
        }
    }

    fn on_session_changed(&mut self, change: SessionChanged) {
        self.generation += 1;
        debug!(event = ?change.event, generation = self.generation, "auth event");
        match change.session {
            Some(session) => self.spawn_fetch(FetchOrigin::Observer, session.user_id()),
            None => self.set_phase(SessionPhase::Anonymous, None),
        }
    }

    fn begin_restore(&mut self) {
        self.set_phase(SessionPhase::Loading, None);
        let generation = self.generation;
        let identity = Arc::clone(&self.identity);
        let profiles = Arc::clone(&self.profiles);
        let tx = self.tx.clone();

        self.tasks.spawn(async move {
            let msg = match identity.get_session().await {
                Ok(Some(session)) => {
                    let user_id = session.user_id();
                    let result = profiles.fetch_profile(user_id).await;
                    Message::ProfileLoaded { generation, origin: FetchOrigin::Restore, user_id, result }
                }
                Ok(None) => Message::SessionAbsent { generation },
                Err(e) => {
                    warn!(error = %e, "session restore failed; continuing signed out");
                    Message::SessionAbsent { generation }
                }
            };
            post(&tx, msg);
        });
    }

    fn spawn_fetch(&mut self, origin: FetchOrigin, user_id: Uuid) {
        let generation = self.generation;
        let profiles = Arc::clone(&self.profiles);
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            let result = profiles.fetch_profile(user_id).await;
            post(&tx, Message::ProfileLoaded { generation, origin, user_id, result });
        });
    }

    fn apply_profile(&mut self, origin: FetchOrigin, user_id: Uuid, result: Result<UserProfile, ProfileError>) {
        match result {
            Ok(profile) => {
                info!(%user_id, role = %profile.role, ?origin, "session authenticated");
                self.set_phase(SessionPhase::Authenticated(profile), Some(user_id));
            }
            Err(e) if origin == FetchOrigin::Observer && self.sign_ups_in_flight > 0 => {
                debug!(%user_id, error = %e, "profile fetch failed during sign-up; awaiting its retried read");
            }
            Err(e) => {
                let fault = match origin {
                    FetchOrigin::Observer if e.is_missing() => SessionFault::ProfileNotFound,
                    FetchOrigin::Observer | FetchOrigin::Restore => SessionFault::ProfileLoad,
                };
                error!(%user_id, error = %e, ?origin, fault = %fault, "profile fetch failed for active session");
                self.set_phase(SessionPhase::Failed(fault), Some(user_id));
            }
        }
    }

    fn sign_out(&mut self, reply: oneshot::Sender<()>) {
        self.generation += 1;
        self.set_phase(SessionPhase::Anonymous, None);
        let _ = reply.send(());

        let identity = Arc::clone(&self.identity);
        tokio::spawn(async move {
            match identity.sign_out().await {
                Ok(()) => info!("session invalidated"),
                Err(e) => warn!(error = %e, "remote sign-out failed; local session already cleared"),
            }
        });
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation == self.generation {
            return true;
        }
        debug!(generation, current = self.generation, "dropping stale session result");
        false
    }

    fn set_phase(&mut self, phase: SessionPhase, session_user: Option<Uuid>) {
        self.state.send_if_modified(|s| {
            if s.phase == phase && s.session_user == session_user {
                return false;
            }
            s.phase = phase;
            s.session_user = session_user;
            true
        });
    }
}

async fn next_change(subscription: &mut Option<AuthSubscription>) -> Option<SessionChanged> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

fn post(tx: &mpsc::WeakUnboundedSender<Message>, msg: Message) {
    if let Some(tx) = tx.upgrade() {
        let _ = tx.send(msg);
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
