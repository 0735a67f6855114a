//! # Retry Policy
//!
//! Bounded exponential backoff around a single store command. Only transient
//! transport failures are retried; absent keys, decode/parse failures and
//! server error replies return on the first attempt.

use std::time::Duration;

use backon::{BlockingRetryable, ExponentialBuilder};
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Retry configuration for store commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A policy that runs every command exactly once.
    pub const fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .with_factor(2.0)
    }

    /// Runs `operation`, retrying transient failures with backoff.
    ///
    /// Returns the first non-transient error, or the last error once the
    /// retries are exhausted.
    pub fn run<T, F>(&self, command: &'static str, mut operation: F) -> StoreResult<T>
    where
        F: FnMut() -> StoreResult<T>,
    {
        if self.max_retries == 0 {
            return operation();
        }

        let max_retries = self.max_retries;
        let mut attempt = 0u32;
        let notify = |err: &StoreError, delay: Duration| {
            attempt += 1;
            warn!(
                command,
                attempt,
                max_retries,
                next_delay_ms = delay.as_millis() as u64,
                error = %err,
                "store command failed, retrying"
            );
        };

        operation
            .retry(self.backoff())
            .sleep(std::thread::sleep)
            .when(StoreError::is_transient)
            .notify(notify)
            .call()
    }
}
