//! Bounded retry with exponential backoff for profile reads.
//!
//! Sign-up provisions the profile row asynchronously on the backend, so the
//! first read right after registration can legitimately miss. Reads are
//! retried while the error is retryable and attempts remain; the delay
//! doubles from `base_delay` up to `max_delay`.

use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::profile::{ProfileError, ProfileStore, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that tries once and never sleeps.
    #[must_use]
    pub fn once() -> Self {
        Self { attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

/// Fetch a profile, retrying transient misses per `policy`.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or immediately for
/// non-retryable errors.
pub async fn fetch_profile_with_retry(
    store: &dyn ProfileStore,
    user_id: Uuid,
    policy: RetryPolicy,
) -> Result<UserProfile, ProfileError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match store.fetch_profile(user_id).await {
            Ok(profile) => {
                debug!(%user_id, attempt, "profile fetched");
                return Ok(profile);
            }
            Err(e) if e.retryable() && attempt < attempts => {
                let delay = policy.delay_after(attempt);
                warn!(%user_id, error = %e, attempt, total = attempts, ?delay, "profile fetch failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(%user_id, error = %e, attempt, "profile fetch failed; giving up");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
