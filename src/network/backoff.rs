//! Reconnect backoff.
//!
//! A connection that never completed registration counts as a failure and
//! grows the delay exponentially (`base^failures` seconds). A connection
//! that did register resets the count, and the reconnect is immediate.

use std::time::Duration;

/// Exponential backoff keyed on registration success.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: u64,
    failures: u32,
}

impl Backoff {
    pub fn new(base: u64) -> Self {
        Self { base, failures: 0 }
    }

    /// Record the outcome of a connection cycle and return the delay before
    /// the next attempt.
    pub fn next_delay(&mut self, registered: bool) -> Duration {
        if registered {
            self.failures = 0;
            return Duration::ZERO;
        }
        self.failures = self.failures.saturating_add(1);
        Duration::from_secs(self.base.saturating_pow(self.failures))
    }

    /// Consecutive cycles that ended without registration.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
