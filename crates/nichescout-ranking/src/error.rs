use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("invalid embedding API URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by embedding API")]
    RateLimited,

    #[error("embedding API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider returned a different number of vectors than inputs.
    #[error("embedding API returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

impl RankingError {
    /// Transient failures worth another attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            RankingError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            RankingError::RateLimited => true,
            RankingError::Api { status, .. } => *status >= 500,
            RankingError::InvalidBaseUrl { .. }
            | RankingError::Deserialize { .. }
            | RankingError::CountMismatch { .. } => false,
        }
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, RankingError::InvalidBaseUrl { .. })
            || matches!(self, RankingError::Api { status: 401 | 403, .. })
    }
}
