use std::net::SocketAddr;
use std::path::PathBuf;

use crate::candidate::ScoringWeights;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub projects_path: PathBuf,
    pub youtube_api_key: Option<String>,
    pub youtube_base_url: String,
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub oracle_api_url: String,
    pub oracle_api_key: Option<String>,
    pub oracle_model: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub http_backoff_base_ms: u64,
    pub scoring_weights: ScoringWeights,
    pub remove_outliers: bool,
    pub embed_batch_size: usize,
    pub top_k: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("projects_path", &self.projects_path)
            .field("database_url", &"[redacted]")
            .field(
                "youtube_api_key",
                &self.youtube_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("youtube_base_url", &self.youtube_base_url)
            .field("embedding_api_url", &self.embedding_api_url)
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("embedding_model", &self.embedding_model)
            .field("oracle_api_url", &self.oracle_api_url)
            .field(
                "oracle_api_key",
                &self.oracle_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("oracle_model", &self.oracle_model)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_backoff_base_ms", &self.http_backoff_base_ms)
            .field("scoring_weights", &self.scoring_weights)
            .field("remove_outliers", &self.remove_outliers)
            .field("embed_batch_size", &self.embed_batch_size)
            .field("top_k", &self.top_k)
            .finish()
    }
}
