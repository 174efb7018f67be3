//! Errors returned to interactive callers, plus input validation.
//!
//! Validation happens before any identity call so empty forms never reach
//! the network.

use crate::identity::IdentityError;
use crate::profile::{ProfileError, SignUpRole};

/// Inline message shown by the sign-in screen for any non-validation failure.
pub const SIGN_IN_FAILED_MESSAGE: &str = "Invalid email or password";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Name is required")]
    MissingName,

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Identity service refused the request for another reason
    /// (e.g. the address is already registered).
    #[error("{0}")]
    Rejected(String),

    #[error("sign-in succeeded but no session is available")]
    NoSession,

    #[error("Failed to create user profile. Please try again.")]
    ProfileNotFound,

    #[error("network error: {0}")]
    Network(String),

    /// The manager is not running (torn down, or never configured).
    #[error("session manager unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// True for errors the user can fix by editing the form.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingCredentials | Self::MissingName)
    }

    /// Message for the sign-in screen: validation text verbatim, everything
    /// else collapsed to the generic credential message.
    #[must_use]
    pub fn sign_in_message(&self) -> String {
        if self.is_validation() { self.to_string() } else { SIGN_IN_FAILED_MESSAGE.to_owned() }
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::Rejected { message, .. } => Self::Rejected(message),
            IdentityError::Network(e) | IdentityError::Decode(e) => Self::Network(e),
        }
    }
}

impl From<ProfileError> for AuthError {
    fn from(err: ProfileError) -> Self {
        if err.is_missing() { Self::ProfileNotFound } else { Self::Network(err.to_string()) }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Email/password pair that passed the required-field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Trim the email and require both fields.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingCredentials`] when either field is empty.
    pub fn parse(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self { email: email.to_owned(), password: password.to_owned() })
    }
}

/// Registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: SignUpRole,
}

impl SignUpRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>, name: impl Into<String>, role: SignUpRole) -> Self {
        Self { email: email.into(), password: password.into(), name: name.into(), role }
    }

    /// # Errors
    ///
    /// [`AuthError::MissingCredentials`] or [`AuthError::MissingName`].
    pub fn validate(&self) -> Result<(Credentials, String), AuthError> {
        let credentials = Credentials::parse(&self.email, &self.password)?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        Ok((credentials, name.to_owned()))
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod tests;
