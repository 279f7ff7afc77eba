//! Bounded retry with exponential backoff for upstream fetches

use std::future::Future;
use std::time::Duration;

use crate::fetcher::FetchError;

const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// How often a fetch may be attempted.
///
/// The default makes exactly one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(exponent).min(MAX_BACKOFF)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what,
                        attempt,
                        max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(20), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn retries_retryable_errors_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test fetch", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);

        let result: Result<(), FetchError> = policy
            .run("test fetch", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Status(StatusCode::FORBIDDEN)) }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Status(StatusCode::FORBIDDEN))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn default_policy_makes_one_attempt() {
        let calls = AtomicU32::new(0);

        let result: Result<(), FetchError> = RetryPolicy::default()
            .run("test fetch", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Status(StatusCode::BAD_GATEWAY)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
