//! Generic exponential-ish... no — linear-growth retry (C10), gated on a
//! transient-failure predicate.
//!
//! Grounded directly on `original_source/pkg/utils.go`'s `AnyFunc.WithRetry`:
//! up to `attempts` tries, sleeping `wait` (starting at 1s, growing by
//! `interval` after every failure) between them, but only when the caller's
//! predicate classifies the error as transient. Any other error returns
//! immediately.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ATTEMPTS: u32 = 4;
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("operation failed: {0}")]
    Failed(E),
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("retry aborted: context cancelled")]
    Cancelled,
}

/// Runs `f` up to `attempts` times. Between failures classified as transient
/// by `is_transient`, sleeps `wait` and grows it by `interval`. A
/// non-transient error returns immediately as `RetryError::Failed`.
///
/// If `cancel` resolves while sleeping, the attempt chain aborts with
/// `RetryError::Cancelled` (spec.md §5 "retries honor the context").
pub async fn retry_with<F, Fut, T, E>(
    attempts: u32,
    initial_wait: Duration,
    interval: Duration,
    is_transient: impl Fn(&E) -> bool,
    cancel: &tokio_util::sync::CancellationToken,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut wait = initial_wait;
    let mut last_err = None;

    for attempt in 0..attempts {
        match f().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                if !is_transient(&err) {
                    return Err(RetryError::Failed(err));
                }
                last_err = Some(err);
                if attempt + 1 < attempts {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    }
                    wait += interval;
                }
            }
        }
    }

    Err(RetryError::Exhausted {
        attempts,
        last: last_err.expect("attempts > 0 guarantees at least one failure recorded"),
    })
}

/// Convenience wrapper using the spec's defaults (attempts=4, wait=1s, +2s).
pub async fn retry_default<F, Fut, T, E>(
    is_transient: impl Fn(&E) -> bool,
    cancel: &tokio_util::sync::CancellationToken,
    f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    retry_with(
        DEFAULT_ATTEMPTS,
        DEFAULT_INITIAL_WAIT,
        DEFAULT_INTERVAL,
        is_transient,
        cancel,
        f,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let result: Result<i32, RetryError<&str>> =
            retry_with(3, Duration::from_millis(1), Duration::from_millis(1), |_| true, &cancel, || async {
                Ok(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<i32, RetryError<&str>> = retry_with(
            3,
            Duration::from_millis(1),
            Duration::from_millis(1),
            |e: &&str| *e == "connection refused",
            &cancel,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("connection refused")
                    } else {
                        Ok(7)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_error_returns_immediately() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<i32, RetryError<&str>> = retry_with(
            3,
            Duration::from_millis(1),
            Duration::from_millis(1),
            |e: &&str| *e == "connection refused",
            &cancel,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("validation error") }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Failed("validation error"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_all_attempts() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let result: Result<i32, RetryError<&str>> = retry_with(
            3,
            Duration::from_millis(1),
            Duration::from_millis(1),
            |_| true,
            &cancel,
            || async { Err("connection refused") },
        )
        .await;
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
    }
}
