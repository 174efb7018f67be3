//! Session management: current user, sign-in/up/out, and the state machine
//! that route guards and screens read.

pub mod errors;
pub mod manager;
pub mod retry;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use errors::{AuthError, Credentials, SignUpRequest};
pub use manager::SessionManager;
pub use retry::{RetryPolicy, fetch_profile_with_retry};
pub use state::{SessionFault, SessionPhase, SessionState};
