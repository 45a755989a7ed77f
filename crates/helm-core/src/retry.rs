//! Retry Manager (spec §4.9, C9).
//!
//! Exponential-backoff retry with jitter, honoring each error's
//! `isRetryable` discriminant.

use std::future::Future;
use std::time::Duration;

use rand::Rng as _;
use tracing::{error, info, warn};

use crate::error::RuntimeError;

/// Retry policy. Defaults match the spec's default policy
/// `{3, 500, 5000, 2, 250}`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Delay ceiling regardless of backoff growth.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_multiplier: f64,
    /// Maximum additional random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(5000),
            backoff_multiplier: 2.0,
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay to apply after attempt `attempt` (1-indexed) before the next
    /// attempt: `min(base * multiplier^(attempt-1) + U(0, jitter), max)`.
    fn delay_after(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let jitter_secs = if self.jitter.is_zero() {
            0.0
        } else {
            rand::rng().random_range(0.0..self.jitter.as_secs_f64())
        };
        let total = (scaled + jitter_secs).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(total.max(0.0))
    }
}

/// Execute `op` with retry per `policy`, honoring
/// [`RuntimeError::is_retryable`].
///
/// On success, emits INFO with the attempt count. On each retry, emits WARN.
/// On final failure, wraps every observed error in [`RuntimeError::Retry`];
/// a non-retryable error is returned immediately without wrapping.
pub async fn execute_with_retry<F, Fut, T>(
    mut op: F,
    name: &str,
    policy: RetryPolicy,
) -> Result<T, RuntimeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RuntimeError>>,
{
    let mut all_errors = Vec::new();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(name, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                all_errors.push(err.to_string());
                if attempt >= policy.max_attempts {
                    error!(name, attempt, "operation failed after final attempt");
                    return Err(RuntimeError::Retry {
                        name: name.to_string(),
                        attempts: attempt,
                        last_error: Box::new(err),
                        all_errors,
                    });
                }
                let delay = policy.delay_after(attempt);
                warn!(
                    name,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "retrying after failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::BrowserProcessStage;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: Duration::ZERO,
        }
    }

    fn retryable_launch_error() -> RuntimeError {
        RuntimeError::BrowserProcess {
            stage: BrowserProcessStage::Launch,
            message: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_attempt() {
        let attempts = AtomicU32::new(0);
        let result = execute_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RuntimeError>(42) }
            },
            "test-op",
            fast_policy(),
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success_within_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result = execute_with_retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(retryable_launch_error())
                    } else {
                        Ok(())
                    }
                }
            },
            "test-op",
            fast_policy(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let attempts = AtomicU32::new(0);
        let result = execute_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(RuntimeError::ConfigurationInvalid("bad".to_string())) }
            },
            "test-op",
            fast_policy(),
        )
        .await;
        assert!(matches!(result, Err(RuntimeError::ConfigurationInvalid(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_attempts_wraps_in_retry_error() {
        let result = execute_with_retry(
            || async { Err::<(), _>(retryable_launch_error()) },
            "test-op",
            fast_policy(),
        )
        .await;
        match result {
            Err(RuntimeError::Retry { attempts, all_errors, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(all_errors.len(), 3);
            }
            other => panic!("expected Retry error, got {other:?}"),
        }
    }

    #[test]
    fn delay_after_is_bounded_by_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(5000),
            backoff_multiplier: 2.0,
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(10), Duration::from_millis(5000));
    }
}
