//! Bounded retry with exponential backoff and a per-attempt timeout.

use std::{future::Future, time::Duration};

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::errors::ProviderError;

/// Upper bound for a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Retry behaviour for provider calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled per further retry.
    pub base_backoff: Duration,
    /// Upper bound on each attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), capped at [`MAX_BACKOFF`].
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Runs `op` until it succeeds, fails permanently, or retries are exhausted.
///
/// Each attempt is bounded by `policy.attempt_timeout`; an elapsed attempt
/// counts as [`ProviderError::Timeout`], which is transient.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(v)) => {
                if attempt > 0 {
                    debug!(what, attempt, "succeeded after retry");
                }
                return Ok(v);
            }
            Ok(Err(e)) => e,
            Err(_) => ProviderError::Timeout(policy.attempt_timeout),
        };

        if !err.is_transient() || attempt >= policy.max_retries {
            return Err(err);
        }

        attempt += 1;
        let delay = policy.delay_for(attempt);
        warn!(
            what,
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient provider failure, retrying"
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_backoff: Duration::from_millis(1),
            attempt_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy {
            base_backoff: Duration::from_millis(200),
            ..RetryPolicy::default()
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(2), Duration::from_millis(400));
        assert_eq!(p.delay_for(3), Duration::from_millis(800));
        assert_eq!(p.delay_for(40), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let out = retry_transient(&policy(), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::Unreachable("refused".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(out, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let out: Result<(), _> = retry_transient(&policy(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Malformed("bad json".into()))
        })
        .await;
        assert!(matches!(out, Err(ProviderError::Malformed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = &AtomicU32::new(0);
        let out: Result<(), _> = retry_transient(&policy(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Status {
                status: 503,
                detail: String::new(),
            })
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_time_out() {
        let p = RetryPolicy {
            max_retries: 0,
            ..policy()
        };
        let out: Result<(), _> = retry_transient(&p, "test", || async {
            sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert_eq!(out, Err(ProviderError::Timeout(Duration::from_millis(200))));
    }
}
