//! Exponential-backoff retry wrapper for CoinGecko calls.

use crate::error::{CoinGeckoError, Result};
use std::future::Future;
use std::time::Duration;

/// Runs `op`, retrying transient failures up to `retries` additional
/// times.
///
/// Backoff is `base_delay * 2^attempt`, floored by a 429 Retry-After hint
/// (falling back to `base_delay` when absent) and by `2 * base_delay`
/// after a server error. Non-transient errors fail immediately.
///
/// # Errors
/// Returns the final attempt's error once retries are exhausted, or the
/// first non-transient error.
pub async fn with_retry<T, F, Fut>(retries: u32, base_delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries && err.is_transient() => {
                let delay = backoff_delay(base_delay, attempt, &err);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying CoinGecko call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(base_delay: Duration, attempt: u32, err: &CoinGeckoError) -> Duration {
    let mut delay = base_delay * 2u32.pow(attempt);
    match err {
        CoinGeckoError::RateLimit { retry_after_secs } => {
            let hint = retry_after_secs.map_or(base_delay, Duration::from_secs);
            delay = delay.max(hint);
        }
        CoinGeckoError::Api { status_code, .. } if *status_code >= 500 => {
            delay = delay.max(base_delay * 2);
        }
        _ => {}
    }
    delay
}
