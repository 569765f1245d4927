//! Fixed-delay retry for fallible async operations.
//!
//! Used at every feed, browser and storage call site so that transient
//! failures are handled in one place.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently to retry an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Fixed delay between attempts.
    pub delay_ms: u64,
    /// Total attempts before the last error is returned. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            max_attempts,
        }
    }

    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self::new(delay, Some(max_attempts))
    }

    pub fn unbounded(delay: Duration) -> Self {
        Self::new(delay, None)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(1))
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// Every failure is logged with `message`. Once the remaining attempts reach
/// zero the error of the last attempt is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, message: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_if(policy, message, operation, |_| true).await
}

/// Like [`retry`], but only errors accepted by `retryable` are retried.
/// Any other error is returned from the attempt that produced it.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    message: &str,
    mut operation: F,
    retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut remaining = policy.max_attempts;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !retryable(&err) {
            return Err(err);
        }

        if let Some(left) = remaining.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                warn!(attempt, "{}: {}; giving up", message, err);
                return Err(err);
            }
        }

        warn!(attempt, delay_ms = policy.delay_ms, "{}: {}; retrying", message, err);
        tokio::time::sleep(policy.delay()).await;
    }
}
