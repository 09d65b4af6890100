use crate::app_config::{AppConfig, Environment};
use crate::candidate::ScoringWeights;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so tests
/// can drive them with a plain `HashMap`.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates with blank keys work.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let parse_weight = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(var, "must be a finite, non-negative number".to_string()));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("NICHESCOUT_ENV", "development"))?;
    let bind_addr = parse_addr("NICHESCOUT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("NICHESCOUT_LOG_LEVEL", "info");
    let projects_path = PathBuf::from(or_default(
        "NICHESCOUT_PROJECTS_PATH",
        "./config/projects.yaml",
    ));

    let youtube_api_key = optional("YOUTUBE_API_KEY");
    let youtube_base_url = or_default(
        "YOUTUBE_API_BASE_URL",
        "https://www.googleapis.com/youtube/v3/",
    );
    let embedding_api_url = or_default("EMBEDDING_API_URL", "https://api.openai.com/v1");
    let embedding_api_key = optional("EMBEDDING_API_KEY");
    let embedding_model = or_default("EMBEDDING_MODEL", "text-embedding-3-small");
    let oracle_api_url = or_default("ORACLE_API_URL", "https://api.openai.com/v1");
    let oracle_api_key = optional("ORACLE_API_KEY");
    let oracle_model = or_default("ORACLE_MODEL", "gpt-4o-mini");

    let db_max_connections = parse_u32("NICHESCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("NICHESCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("NICHESCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("NICHESCOUT_HTTP_TIMEOUT_SECS", "30")?;
    let http_max_retries = parse_u32("NICHESCOUT_HTTP_MAX_RETRIES", "3")?;
    let http_backoff_base_ms = parse_u64("NICHESCOUT_HTTP_BACKOFF_BASE_MS", "500")?;

    let scoring_weights = ScoringWeights {
        engagement: parse_weight("NICHESCOUT_WEIGHT_ENGAGEMENT", "0.4")?,
        velocity: parse_weight("NICHESCOUT_WEIGHT_VELOCITY", "0.3")?,
        tag: parse_weight("NICHESCOUT_WEIGHT_TAG", "0.2")?,
        category: parse_weight("NICHESCOUT_WEIGHT_CATEGORY", "0.1")?,
    };
    let remove_outliers = parse_bool("NICHESCOUT_REMOVE_OUTLIERS", "true")?;
    let embed_batch_size = parse_positive_usize("NICHESCOUT_EMBED_BATCH_SIZE", "5")?;
    let top_k = parse_positive_usize("NICHESCOUT_TOP_K", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        projects_path,
        youtube_api_key,
        youtube_base_url,
        embedding_api_url,
        embedding_api_key,
        embedding_model,
        oracle_api_url,
        oracle_api_key,
        oracle_model,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_max_retries,
        http_backoff_base_ms,
        scoring_weights,
        remove_outliers,
        embed_batch_size,
        top_k,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unknown values are rejected so a typo never silently runs as development.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "NICHESCOUT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
