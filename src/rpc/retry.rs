use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Fixed-delay bounded retry, shared by the chain and market-data clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Only transient errors (see [`crate::AppError::is_transient`]) are retried. The last
/// error is returned once attempts run out; callers decide how to degrade.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut operation: F) -> Result<T>
    where F: FnMut() -> Fut, Fut: Future<Output = Result<T>>
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "{} failed, retrying in {:?}",
                    label,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!(attempts, error = %e, "{} failed after all retries", label);
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{ AtomicU32, Ordering };

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = with_retry(fast(3), "get_slot", || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(AppError::External("connection reset".to_string()))
            } else {
                Ok(n)
            }
        }).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_limit() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = with_retry(fast(4), "get_slot", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Rpc("node unhealthy".to_string()))
        }).await;

        assert!(matches!(result, Err(AppError::Rpc(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_parse_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = with_retry(fast(5), "get_slot", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Parse("unexpected token".to_string()))
        }).await;

        assert!(matches!(result, Err(AppError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = with_retry(fast(0), "get_slot", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::External("timeout".to_string()))
        }).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
