//! Observable session state.
//!
//! `Uninitialized -> Loading -> {Authenticated | Anonymous | Failed}`.
//! A configuration fault is terminal; profile faults are left by signing
//! out or by a later session event whose profile loads.

use uuid::Uuid;

use crate::profile::{Role, UserProfile};

/// Persistent component-level error. Rendered as a full-screen message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFault {
    #[error("Missing backend configuration: {0}")]
    Configuration(String),

    /// A session exists but its profile row does not.
    #[error("User profile not found")]
    ProfileNotFound,

    /// A session exists but its profile row could not be read.
    #[error("Error loading user profile")]
    ProfileLoad,
}

impl SessionFault {
    /// Terminal faults need a restart with fixed configuration.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    /// Startup restore in progress.
    Loading,
    Authenticated(UserProfile),
    Anonymous,
    Failed(SessionFault),
}

/// Snapshot published by the session manager on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Interactive calls (sign-in / sign-up) currently in flight.
    pub pending_calls: u32,
    /// Identity-service user whose session the phase describes; `None` when
    /// no session is involved.
    pub session_user: Option<Uuid>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { phase: SessionPhase::Uninitialized, pending_calls: 0, session_user: None }
    }
}

impl SessionState {
    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        match &self.phase {
            SessionPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    #[must_use]
    pub fn fault(&self) -> Option<&SessionFault> {
        match &self.phase {
            SessionPhase::Failed(fault) => Some(fault),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SessionPhase::Uninitialized | SessionPhase::Loading) || self.pending_calls > 0
    }

    /// True once startup restore has reached a resting phase.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self.phase, SessionPhase::Uninitialized | SessionPhase::Loading)
    }

    /// True once `user_id`'s session has resolved to a user or a fault.
    #[must_use]
    pub fn is_resolved_for(&self, user_id: Uuid) -> bool {
        self.session_user == Some(user_id) && (self.user().is_some() || self.fault().is_some())
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.fault().is_some_and(SessionFault::is_terminal)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
