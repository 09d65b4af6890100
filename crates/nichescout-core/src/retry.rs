//! Retry with exponential back-off and jitter, shared by every HTTP client.
//!
//! Each client decides which of its errors are transient; this module only
//! owns the schedule.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Upper bound on the nominal delay before jitter is applied.
const MAX_DELAY_MS: u64 = 60_000;

/// Delay before the `attempt`-th retry (1-based): `base × 2ⁿ⁻¹`, capped at
/// 60 s, then scaled by a random factor in `[0.75, 1.25)`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let capped = base_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10))
        .min(MAX_DELAY_MS);
    (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
}

/// Runs `operation` with up to `max_retries` additional attempts while
/// `is_retriable` accepts the error.
///
/// # Errors
///
/// Returns the first non-retriable error, or the last error once the retry
/// budget is spent.
pub async fn retry_with_backoff<T, E, R, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    is_retriable: R,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    R: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) && attempt < max_retries => {
                attempt += 1;
                let delay_ms = backoff_delay_ms(backoff_base_ms, attempt);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
