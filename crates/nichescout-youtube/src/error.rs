use thiserror::Error;

/// Errors returned by the YouTube Data API client.
#[derive(Debug, Error)]
pub enum YoutubeError {
    /// No API key configured; the stage cannot run until one is provided.
    #[error("YouTube API key is not configured (set YOUTUBE_API_KEY)")]
    MissingApiKey,

    #[error("invalid YouTube base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 or a `rateLimitExceeded` reason.
    #[error("rate limited by YouTube API")]
    RateLimited,

    /// Daily quota exhausted. Retrying will not help until the quota resets.
    #[error("YouTube quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other non-2xx response, with the API's error message when present.
    #[error("YouTube API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl YoutubeError {
    /// `true` for missing or invalid setup that no retry can fix.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            YoutubeError::MissingApiKey | YoutubeError::InvalidBaseUrl { .. }
        )
    }
}
