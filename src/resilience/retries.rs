//! Retry policy.
//!
//! # Responsibilities
//! - Bound the number of attempts against a remote endpoint
//! - Space attempts with linear backoff
//! - Stop immediately on errors that are not retryable

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::SendError;
use crate::resilience::backoff::calculate_backoff;

/// Bounded retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Per-attempt delay step.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Single attempt, no delay.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. The closure receives the 1-based attempt.
pub async fn retry_with<T, F, Fut>(policy: &RetryPolicy, label: &str, op: F) -> Result<T, SendError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SendError>>,
{
    retry_if(policy, label, SendError::is_retryable, op).await
}

/// Like [`retry_with`], with the caller deciding which errors are retried.
pub async fn retry_if<T, E, F, Fut, P>(policy: &RetryPolicy, label: &str, retryable: P, mut op: F) -> Result<T, E>
where
    E: fmt::Display,
    P: Fn(&E) -> bool,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if retryable(&e) && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    operation = label,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
