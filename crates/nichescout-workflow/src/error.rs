use nichescout_core::{CoreError, StoreError};
use nichescout_ranking::RankingError;
use nichescout_youtube::YoutubeError;
use thiserror::Error;

use crate::oracle::OracleError;
use crate::stage::Stage;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid credentials/settings. Not retried automatically.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Rate limit, transport failure or malformed provider envelope.
    #[error("external call failed: {0}")]
    External(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// The stage produced nothing to work with; inputs must change.
    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("unknown project status: {0}")]
    UnknownStatus(String),

    /// The invocation was superseded by navigation or a newer invocation.
    #[error("stale {stage} invocation discarded")]
    StaleInvocation { stage: Stage },

    #[error("not found: {0}")]
    NotFound(String),
}

impl PipelineError {
    /// `true` for failures the user can retry without changing anything.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, PipelineError::External(_) | PipelineError::Store(_))
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProjectNotFound(id) => PipelineError::NotFound(format!("project {id}")),
            StoreError::Core(CoreError::UnknownStatus(s)) => PipelineError::UnknownStatus(s),
            other => PipelineError::Store(other),
        }
    }
}

impl From<YoutubeError> for PipelineError {
    fn from(err: YoutubeError) -> Self {
        if err.is_configuration() {
            PipelineError::Configuration(err.to_string())
        } else {
            PipelineError::External(err.to_string())
        }
    }
}

impl From<RankingError> for PipelineError {
    fn from(err: RankingError) -> Self {
        if err.is_configuration() {
            PipelineError::Configuration(err.to_string())
        } else {
            PipelineError::External(err.to_string())
        }
    }
}

impl From<OracleError> for PipelineError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::MissingApiKey | OracleError::InvalidBaseUrl { .. } => {
                PipelineError::Configuration(err.to_string())
            }
            OracleError::Api {
                status: 401 | 403, ..
            } => PipelineError::Configuration(err.to_string()),
            OracleError::MalformedJson { .. } => PipelineError::Parse(err.to_string()),
            _ => PipelineError::External(err.to_string()),
        }
    }
}
