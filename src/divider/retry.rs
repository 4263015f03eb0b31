//! Bounded retry around one decomposition attempt.
//!
//! Only the invalid-generation signal is retried; every other error class
//! propagates on the first occurrence. The loop stops at whichever comes
//! first of an elapsed wall-clock budget (measured from the first attempt)
//! and an attempt count, then returns the last error unchanged.

use std::time::{Duration, Instant};

use tracing::warn;

use super::error::DividerError;

/// Stop conditions for the retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Give up once this much wall-clock time has passed since the first
    /// attempt started. Does not interrupt an in-flight attempt.
    pub stop_after_delay: Duration,

    /// Give up after this many attempts (>= 1).
    pub stop_after_attempt: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            stop_after_delay: Duration::from_secs(20),
            stop_after_attempt: 5,
        }
    }
}

impl RetryPolicy {
    /// Decide whether attempt number `attempt` (1-based) may be followed by
    /// another one after failing with `error`.
    ///
    /// This is the single source of stop semantics; both the blocking and
    /// the suspension-capable divider paths go through it.
    pub fn should_retry(&self, attempt: u32, elapsed: Duration, error: &DividerError) -> bool {
        error.is_invalid_generation()
            && attempt < self.stop_after_attempt
            && elapsed < self.stop_after_delay
    }

    /// Run `attempt_fn` under this policy, blocking variant.
    ///
    /// # Errors
    /// The last error raised by `attempt_fn` once the policy stops, with no
    /// wrapping.
    pub fn run<T>(
        &self,
        mut attempt_fn: impl FnMut() -> Result<T, DividerError>,
    ) -> Result<T, DividerError> {
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match attempt_fn() {
                Err(error) if self.should_retry(attempt, started.elapsed(), &error) => {
                    warn!(attempt, "invalid generation from model, retrying");
                }
                other => return other,
            }
        }
    }
}
