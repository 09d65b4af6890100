//! Concept drafts and analysis results: one of each per project.

use chrono::{DateTime, Utc};
use nichescout_core::{decode_embedding, encode_embedding, AnalysisResult, ConceptDraft};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `concept_drafts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConceptRow {
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub embedding: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConceptRow> for ConceptDraft {
    fn from(row: ConceptRow) -> Self {
        let embedding = decode_embedding(row.embedding.as_ref()).unwrap_or_else(|e| {
            tracing::warn!(
                project_id = row.project_id,
                error = %e,
                "ignoring malformed concept embedding"
            );
            None
        });
        ConceptDraft {
            title: row.title,
            description: row.description,
            tags: row.tags,
            embedding,
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_concept(pool: &PgPool, project_id: i64) -> Result<Option<ConceptDraft>, DbError> {
    let row = sqlx::query_as::<_, ConceptRow>(
        "SELECT project_id, title, description, tags, embedding, updated_at \
         FROM concept_drafts \
         WHERE project_id = $1",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ConceptDraft::from))
}

/// Insert or overwrite the project's concept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_concept(
    pool: &PgPool,
    project_id: i64,
    concept: &ConceptDraft,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO concept_drafts (project_id, title, description, tags, embedding) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (project_id) DO UPDATE SET \
             title = EXCLUDED.title, \
             description = EXCLUDED.description, \
             tags = EXCLUDED.tags, \
             embedding = EXCLUDED.embedding, \
             updated_at = NOW()",
    )
    .bind(project_id)
    .bind(concept.title.trim())
    .bind(&concept.description)
    .bind(&concept.tags)
    .bind(concept.embedding.as_deref().map(encode_embedding))
    .execute(pool)
    .await?;
    Ok(())
}

/// The persisted analysis, or `None` when absent.
///
/// # Errors
///
/// Returns [`DbError::Payload`] when the stored JSON no longer matches
/// [`AnalysisResult`], or [`DbError::Sqlx`] if the query fails.
pub async fn load_analysis(
    pool: &PgPool,
    project_id: i64,
) -> Result<Option<AnalysisResult>, DbError> {
    let payload: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT payload FROM analysis_results WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(pool)
            .await?;

    payload
        .map(serde_json::from_value)
        .transpose()
        .map_err(DbError::from)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_analysis(
    pool: &PgPool,
    project_id: i64,
    analysis: &AnalysisResult,
) -> Result<(), DbError> {
    let payload = serde_json::to_value(analysis)?;
    sqlx::query(
        "INSERT INTO analysis_results (project_id, version, payload, created_at) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (project_id) DO UPDATE SET \
             version = EXCLUDED.version, \
             payload = EXCLUDED.payload, \
             created_at = EXCLUDED.created_at",
    )
    .bind(project_id)
    .bind(i32::try_from(analysis.version).unwrap_or(i32::MAX))
    .bind(payload)
    .bind(analysis.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop the persisted analysis. A no-op when none exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_analysis(pool: &PgPool, project_id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM analysis_results WHERE project_id = $1")
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(())
}
