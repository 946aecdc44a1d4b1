//! Retry policy and the shared attempt loop.
//!
//! [`with_retry`] runs an async operation up to `max_attempts` times. Each
//! attempt is bounded by the policy's deadline; an attempt that overruns it
//! is dropped (cancelling the in-flight request) and counts as a transient
//! [`HuginnError::Timeout`]. Backoff between attempts is linear:
//! `base_delay * attempt`, where `attempt` is the 1-based number of the
//! attempt that just failed. A provider `retry_after` hint replaces the
//! linear delay but is capped at `max_delay`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::telemetry;
use crate::{HuginnError, Result};

/// Retry behaviour for one model.
///
/// ```rust
/// # use huginn::providers::retry::RetryPolicy;
/// # use std::time::Duration;
/// let policy = RetryPolicy::new()
///     .max_attempts(5)
///     .base_delay(Duration::from_millis(200))
///     .timeout(Duration::from_secs(10));
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Delay unit for linear backoff. Default: 1s.
    pub base_delay: Duration,
    /// Deadline for each individual attempt. Default: 30s.
    pub timeout: Duration,
    /// Upper bound for a provider `retry_after` hint. Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the linear backoff unit.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the per-attempt deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cap applied to provider `retry_after` hints.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay after the given failed attempt (1-based): `base_delay * attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Delay after a failed attempt, respecting a provider `retry_after` hint.
    ///
    /// The hint never exceeds `max_delay`, or the linear delay when that is
    /// larger.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let linear = self.delay_for_attempt(attempt);
        match retry_after {
            Some(hint) => hint.min(self.max_delay.max(linear)),
            None => linear,
        }
    }
}

/// Execute an async operation with deadline and retry.
///
/// Transient errors (see [`HuginnError::is_transient`]) are retried until
/// `policy.max_attempts` is reached, then reported as
/// [`HuginnError::RetriesExhausted`] carrying the last error. Permanent
/// errors are returned immediately. Attempts are strictly sequential.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    model: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.timeout, f()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(HuginnError::Timeout(policy.timeout)),
        };
        match outcome {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "model" => model.to_owned(),
                    "operation" => operation.to_owned(),
                )
                .increment(1);
                let delay = policy.effective_delay(attempt, e.retry_after());
                warn!(
                    model,
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_transient() => {
                return Err(HuginnError::RetriesExhausted {
                    model: model.to_owned(),
                    attempts: max_attempts,
                    source: Box::new(e),
                });
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
}
