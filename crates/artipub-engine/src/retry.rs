//! Conflict retry policy.
//!
//! Exponential backoff between publish attempts that lost an optimistic
//! concurrency race.

use std::time::Duration;

/// Default number of attempts, the first included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the second attempt.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;

/// Default multiplier between consecutive delays.
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;

/// Default ceiling for a single delay.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first included; `1` disables retries
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// `initial * factor^(attempt - 1)`, capped at `max_backoff`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let initial_ms = self.initial_backoff.as_millis() as u64;
        let multiplier = u64::from(self.backoff_factor).saturating_pow(attempt.saturating_sub(1));
        let delay_ms = initial_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms).min(self.max_backoff)
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
