//! Shared domain types, configuration and the persisted-artifact contract
//! for the NicheScout competitive research pipeline.

pub mod analysis;
pub mod app_config;
pub mod candidate;
pub mod config;
pub mod embedding;
pub mod project;
pub mod projects;
pub mod retry;
pub mod store;

use thiserror::Error;

pub use analysis::{
    AnalysisResult, CandidateMatch, ConceptDraft, ContentGap, ExtendedInsights, Suggestions,
    ANALYSIS_ARTIFACT_VERSION,
};
pub use app_config::{AppConfig, Environment};
pub use candidate::{Candidate, CandidateMetrics, ScoringWeights};
pub use config::{load_app_config, load_app_config_from_env};
pub use embedding::{decode_embedding, encode_embedding};
pub use project::{ProjectStatus, ResearchProject, TimeWindow};
pub use projects::{load_projects, ProjectDefinition, ProjectsFile};
pub use store::{ProjectStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read projects file {path}: {source}")]
    ProjectsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse projects file: {0}")]
    ProjectsFileParse(#[from] serde_yaml::Error),

    #[error("projects file validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown project status: {0}")]
    UnknownStatus(String),

    #[error("unknown time window: {0}")]
    UnknownTimeWindow(String),

    #[error("malformed embedding: {0}")]
    MalformedEmbedding(String),
}
