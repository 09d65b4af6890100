//! Retry policy for YouTube API calls.
//!
//! Only transient failures are retried. Quota exhaustion is a hard stop so a
//! retry loop never burns the remaining daily budget.

use std::future::Future;

use crate::error::YoutubeError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 429, HTTP 5xx.
///
/// **Not retriable:** missing/invalid configuration, quota exhaustion,
/// other 4xx responses, malformed bodies.
pub(crate) fn is_retriable(err: &YoutubeError) -> bool {
    match err {
        YoutubeError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        YoutubeError::RateLimited => true,
        YoutubeError::Api { status, .. } => *status >= 500,
        YoutubeError::MissingApiKey
        | YoutubeError::InvalidBaseUrl { .. }
        | YoutubeError::QuotaExceeded(_)
        | YoutubeError::Deserialize { .. } => false,
    }
}

/// Runs `operation` under the shared back-off schedule, retrying only
/// what [`is_retriable`] accepts.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    operation: F,
) -> Result<T, YoutubeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, YoutubeError>>,
{
    nichescout_core::retry::retry_with_backoff(
        max_retries,
        backoff_base_ms,
        is_retriable,
        operation,
    )
    .await
}
