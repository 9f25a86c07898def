use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use super::{DataError, DataResult};

/// Retry an operation with jittered exponential backoff. Only errors the
/// error type marks as retryable are retried; anything else surfaces on the
/// first attempt.
pub async fn retry_with_backoff<F, Fut, T>(operation: F, max_attempts: usize) -> DataResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = DataResult<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(100)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(max_attempts);

    RetryIf::spawn(retry_strategy, operation, |error: &DataError| {
        if error.is_retryable() {
            tracing::warn!("Retryable data error: {}", error);
            true
        } else {
            tracing::error!("Non-retryable data error: {}", error);
            false
        }
    })
    .await
}
