//! Generic retry wrapper for transient upstream failures
//!
//! Used around ScopeStack API calls. Fixed or doubling delay, no jitter, no
//! circuit breaker. Errors that should never be retried (bad credentials,
//! rejected payloads) are wrapped in [`NonRetryableError`], which short-circuits
//! to a single attempt.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

/// Marker error that stops retries immediately
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct NonRetryableError {
    pub message: String,
}

impl NonRetryableError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Observer callback invoked before each retry wait
pub type OnRetry = Box<dyn Fn(u32, &anyhow::Error) + Send + Sync>;

/// Options controlling [`with_retry`]
pub struct RetryOptions {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the next attempt
    pub delay_ms: u64,
    /// Double the delay after each failed attempt
    pub backoff: bool,
    /// Called with (attempt_number, error) after each failed attempt that will be retried
    pub on_retry: Option<OnRetry>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            backoff: true,
            on_retry: None,
        }
    }
}

impl RetryOptions {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
            ..Default::default()
        }
    }

    pub fn without_backoff(mut self) -> Self {
        self.backoff = false;
        self
    }

    pub fn with_on_retry(mut self, callback: OnRetry) -> Self {
        self.on_retry = Some(callback);
        self
    }
}

/// Check whether a [`NonRetryableError`] appears anywhere in the chain,
/// either as the root error or as an attached context layer
fn is_non_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NonRetryableError>().is_some()
}

/// Run `f` up to `opts.max_attempts` times, waiting between attempts.
///
/// Returns the first success, or the last error once attempts are exhausted.
/// A [`NonRetryableError`] anywhere in the error chain returns after the first
/// failure regardless of `max_attempts`.
pub async fn with_retry<T, F, Fut>(mut f: F, opts: RetryOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = opts.max_attempts.max(1);
    let mut delay_ms = opts.delay_ms;
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 1..=max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if is_non_retryable(&err) {
                    return Err(err);
                }
                if attempt < max_attempts {
                    if let Some(ref on_retry) = opts.on_retry {
                        on_retry(attempt, &err);
                    }
                    log::debug!(
                        "Attempt {}/{} failed, retrying in {}ms: {}",
                        attempt,
                        max_attempts,
                        delay_ms,
                        err
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    if opts.backoff {
                        delay_ms = delay_ms.saturating_mul(2);
                    }
                }
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("retry exhausted with no recorded error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = with_retry(
            move || {
                let calls = calls_clone.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        anyhow::bail!("transient failure {}", n)
                    }
                    Ok(42)
                }
            },
            RetryOptions::new(3, 0),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts_and_returns_last_error() {
        let result: Result<()> = with_retry(
            || async { anyhow::bail!("always fails") },
            RetryOptions::new(2, 0),
        )
        .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("always fails"));
    }

    #[tokio::test]
    async fn test_on_retry_called_once_per_failed_attempt() {
        let retries = Arc::new(AtomicU32::new(0));
        let retries_clone = retries.clone();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let opts = RetryOptions::new(5, 0).with_on_retry(Box::new(move |_attempt, _err| {
            retries_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let result = with_retry(
            move || {
                let calls = calls_clone.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        anyhow::bail!("not yet")
                    }
                    Ok("done")
                }
            },
            opts,
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        // Two failures before success means exactly two retry callbacks
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<()> = with_retry(
            move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(NonRetryableError::new("bad credentials").into())
                }
            },
            RetryOptions::new(5, 0),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_detected_through_context_chain() {
        use anyhow::Context;

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<()> = with_retry(
            move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::Error::from(NonRetryableError::new("rejected")))
                        .context("while creating survey")
                }
            },
            RetryOptions::new(4, 0),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
