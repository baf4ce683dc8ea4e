//! Retry-once boundary around a whole run

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Runs `attempt`, and runs it once more after `delay` if it fails
///
/// Errors for which `retryable` returns false are returned at once. The
/// second failure is returned as is.
pub async fn run_with_retry<T, E, F, Fut>(
    delay: Duration,
    retryable: impl Fn(&E) -> bool,
    mut attempt: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match attempt().await {
        Ok(value) => Ok(value),
        Err(e) if !retryable(&e) => Err(e),
        Err(e) => {
            tracing::warn!("Run failed: {}; retrying in {:?}", e, delay);
            tokio::time::sleep(delay).await;
            attempt().await
        }
    }
}
