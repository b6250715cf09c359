//! Caller-side retries for transient storage failures.
//!
//! The content store never retries on its own; callers that can afford to
//! wait (the export binary, request handlers) wrap calls here.

use crate::error::ContentError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempt limit and exponential backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total calls, first one included
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Upper bound for any single backoff
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Create a new retry configuration. At least one attempt is always made.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset: request-path reads (3 attempts)
    /// Delays: 100ms, 200ms
    pub fn storage_read() -> Self {
        Self::new(3, Duration::from_millis(100)).with_max_delay(Duration::from_millis(500))
    }

    /// Preset: build-time export (5 attempts)
    /// Delays: 500ms, 1s, 2s, 4s
    pub fn build_export() -> Self {
        Self::new(5, Duration::from_millis(500)).with_max_delay(Duration::from_secs(5))
    }

    /// Backoff before the 0-based `attempt`; the first call never waits.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::storage_read()
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects its error, or
/// `config.max_attempts` calls have been made.
///
/// # Arguments
/// * `config` - Attempt limit and backoff schedule
/// * `operation_name` - Label used in log events
/// * `operation` - Produces a fresh future for every attempt
/// * `should_retry` - Whether an error is transient
///
/// # Returns
/// The first success, or the error of the last attempt made.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let backoff = config.delay_for_attempt(attempt);
        if !backoff.is_zero() {
            sleep(backoff).await;
        }
        attempt += 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "recovered after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let exhausted = attempt >= max_attempts;
        if exhausted || !should_retry(&err) {
            warn!(
                operation = operation_name,
                attempts = attempt,
                exhausted,
                error = %err,
                "giving up"
            );
            return Err(err);
        }

        debug!(
            operation = operation_name,
            attempt,
            max_attempts,
            next_delay = ?config.delay_for_attempt(attempt),
            error = %err,
            "transient failure, backing off"
        );
    }
}

/// Retry a storage call while it fails with a retryable [`ContentError`].
pub async fn with_storage_retry<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, ContentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ContentError>>,
{
    with_retry_if(config, operation_name, operation, ContentError::is_retryable).await
}
