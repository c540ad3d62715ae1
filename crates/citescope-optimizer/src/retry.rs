//! Retry with exponential back-off and jitter for reasoning-service calls.

use std::future::Future;
use std::time::Duration;

use crate::error::AnalyzerError;

const MAX_DELAY_SECS: u64 = 60;

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// Timeouts, connection failures, HTTP 429 and 5xx are transient. Missing
/// credentials, bad configuration, 4xx and empty completions are not.
pub(crate) fn is_retriable(err: &AnalyzerError) -> bool {
    match err {
        AnalyzerError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        AnalyzerError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
        AnalyzerError::EmptyCompletion
        | AnalyzerError::MissingCredential
        | AnalyzerError::InvalidBaseUrl { .. } => false,
    }
}

/// Sleep before retry number `attempt` (1-based): `base × 2^(attempt-1)`
/// seconds capped at 60 s, scaled by `jitter` (expected in `0.75..=1.25`).
fn backoff_delay(attempt: u32, backoff_base_secs: u64, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let secs = backoff_base_secs
        .saturating_mul(1u64 << exponent)
        .min(MAX_DELAY_SECS);
    #[allow(clippy::cast_precision_loss)]
    Duration::from_secs_f64(secs as f64 * jitter.max(0.0))
}

/// Retries `operation` on transient errors, at most `max_retries` times
/// after the first attempt. Anything not [`is_retriable`] returns at once.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, AnalyzerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalyzerError>>,
{
    let mut retries = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if retries >= max_retries || !is_retriable(&err) => return Err(err),
            Err(err) => err,
        };

        retries += 1;
        let delay = backoff_delay(retries, backoff_base_secs, rand::random_range(0.75..=1.25));
        tracing::warn!(
            retry = retries,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "reasoning service call failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
