//! Profile rows: the application-level user record behind an identity.
//!
//! DESIGN
//! ======
//! The profile lives in the backend's `users` table and is distinct from the
//! identity-service account. Reads must match exactly one row: zero rows
//! means provisioning has not happened (or was never done), more than one
//! means the table is inconsistent. Both are errors, never "anonymous".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ROLE
// =============================================================================

/// Role of a profile. Drives navigation and feature visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
    Employee,
    /// Any value the backend sends that this client does not know.
    #[serde(other)]
    Unknown,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
            Self::Employee => "employee",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles a user may pick when registering. Admins are provisioned out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignUpRole {
    Client,
    Employee,
}

impl From<SignUpRole> for Role {
    fn from(role: SignUpRole) -> Self {
        match role {
            SignUpRole::Client => Self::Client,
            SignUpRole::Employee => Self::Employee,
        }
    }
}

impl FromStr for SignUpRole {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "employee" => Ok(Self::Employee),
            other => Err(format!("unsupported sign-up role '{other}' (expected 'client' or 'employee')")),
        }
    }
}

// =============================================================================
// USER PROFILE
// =============================================================================

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Creation timestamp exactly as the backend reports it.
    pub created_at: String,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile row not found")]
    NotFound,

    #[error("expected one profile row, found {0}")]
    Ambiguous(usize),

    #[error("profile request failed: {0}")]
    Network(String),

    #[error("profile request rejected: status {status}")]
    Rejected { status: u16, body: String },

    #[error("profile response parse failed: {0}")]
    Decode(String),
}

impl ProfileError {
    /// True when the store answered but the row is absent or duplicated.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound | Self::Ambiguous(_))
    }

    /// Errors worth another attempt: the row may still be provisioning, or the
    /// network hiccupped.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::NotFound | Self::Network(_) | Self::Rejected { status: 500..=599, .. })
    }
}

/// Read access to the profile table.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the single profile row whose id matches.
    async fn fetch_profile(&self, id: Uuid) -> Result<UserProfile, ProfileError>;
}

/// Enforce the exactly-one-row rule on a filtered read.
///
/// # Errors
///
/// [`ProfileError::NotFound`] for zero rows, [`ProfileError::Ambiguous`] for more than one.
pub fn single_row(mut rows: Vec<UserProfile>) -> Result<UserProfile, ProfileError> {
    match rows.len() {
        0 => Err(ProfileError::NotFound),
        1 => Ok(rows.remove(0)),
        n => Err(ProfileError::Ambiguous(n)),
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
