//! Retry of transient GitHub failures, grounded in the reference rate
//! limiter's `execute()` — same backoff shape, same transient/permanent
//! split via [`msg2git_error::ProviderError::is_retryable`].

use msg2git_error::ProviderError;
use tokio_retry2::strategy::{jitter, ExponentialBackoff};
use tokio_retry2::{Retry, RetryError};
use tracing::warn;

/// Retry `operation` up to 5 times with 2s-base, factor-2, 60s-capped
/// exponential backoff plus jitter. Only errors where
/// [`ProviderError::is_retryable`] is true are retried; everything else
/// (auth failures, not-found, size limits) fails on the first attempt.
pub async fn retry_transient<F, Fut, R>(operation: F) -> Result<R, ProviderError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<R, ProviderError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(2000)
        .factor(2)
        .max_delay(std::time::Duration::from_secs(60))
        .map(jitter)
        .take(5);

    Retry::spawn(retry_strategy, || async {
        match operation().await {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_retryable() {
                    warn!(error = %e, "transient provider error, will retry");
                    Err(RetryError::Transient { err: e, retry_after: None })
                } else {
                    warn!(error = %e, "permanent provider error, failing immediately");
                    Err(RetryError::Permanent(e))
                }
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use msg2git_error::ProviderErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_transient_until_success() {
        let attempts = AtomicUsize::new(0);
        let result = retry_transient(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::new(ProviderErrorKind::RateLimited("slow down".to_string())))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), ProviderError> = retry_transient(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::new(ProviderErrorKind::NotFound))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
