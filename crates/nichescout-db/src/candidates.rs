//! Database operations for the `project_candidates` table.
//!
//! `position` preserves the scorer's ranking; reads always return rows in
//! that order. Embeddings are stored as JSONB and decoded on read.

use chrono::{DateTime, Utc};
use nichescout_core::{decode_embedding, encode_embedding, Candidate, CandidateMetrics};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `project_candidates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    pub id: i64,
    pub project_id: i64,
    pub position: i32,
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: Option<String>,
    pub channel_id: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub duration_seconds: i64,
    pub published_at: DateTime<Utc>,
    pub metrics: serde_json::Value,
    pub embedding: Option<serde_json::Value>,
}

impl CandidateRow {
    /// Convert to the domain type. A malformed embedding or metrics blob is
    /// logged and dropped rather than failing the whole read.
    #[must_use]
    pub fn into_candidate(self) -> Candidate {
        let embedding = match decode_embedding(self.embedding.as_ref()) {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(
                    project_id = self.project_id,
                    video_id = %self.video_id,
                    error = %e,
                    "ignoring malformed stored embedding"
                );
                None
            }
        };
        let metrics: CandidateMetrics =
            serde_json::from_value(self.metrics).unwrap_or_else(|e| {
                tracing::warn!(video_id = %self.video_id, error = %e, "ignoring malformed metrics");
                CandidateMetrics::default()
            });

        Candidate {
            video_id: self.video_id,
            title: self.title,
            description: self.description,
            tags: self.tags,
            category_id: self.category_id,
            channel_id: self.channel_id,
            channel_title: self.channel_title,
            thumbnail_url: self.thumbnail_url,
            view_count: to_count(self.view_count),
            like_count: to_count(self.like_count),
            comment_count: to_count(self.comment_count),
            duration_seconds: to_count(self.duration_seconds),
            published_at: self.published_at,
            embedding,
            metrics,
        }
    }
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Candidates for a project in ranking order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_candidates(pool: &PgPool, project_id: i64) -> Result<Vec<Candidate>, DbError> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        "SELECT id, project_id, position, video_id, title, description, tags, category_id, \
                channel_id, channel_title, thumbnail_url, view_count, like_count, comment_count, \
                duration_seconds, published_at, metrics, embedding \
         FROM project_candidates \
         WHERE project_id = $1 \
         ORDER BY position",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CandidateRow::into_candidate).collect())
}

/// Replace the project's candidate set. Runs in one transaction so readers
/// never observe a partially written set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is changed.
pub async fn replace_candidates(
    pool: &PgPool,
    project_id: i64,
    candidates: &[Candidate],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM project_candidates WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    for (position, candidate) in candidates.iter().enumerate() {
        sqlx::query(
            "INSERT INTO project_candidates \
                 (project_id, position, video_id, title, description, tags, category_id, \
                  channel_id, channel_title, thumbnail_url, view_count, like_count, \
                  comment_count, duration_seconds, published_at, metrics, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(project_id)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(&candidate.video_id)
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(&candidate.tags)
        .bind(&candidate.category_id)
        .bind(&candidate.channel_id)
        .bind(&candidate.channel_title)
        .bind(&candidate.thumbnail_url)
        .bind(to_column(candidate.view_count))
        .bind(to_column(candidate.like_count))
        .bind(to_column(candidate.comment_count))
        .bind(to_column(candidate.duration_seconds))
        .bind(candidate.published_at)
        .bind(serde_json::to_value(&candidate.metrics)?)
        .bind(candidate.embedding.as_deref().map(encode_embedding))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Attach embeddings to existing candidates. Unknown video ids are ignored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any update fails; the batch is rolled back.
pub async fn save_embeddings(
    pool: &PgPool,
    project_id: i64,
    embeddings: &[(String, Vec<f32>)],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for (video_id, vector) in embeddings {
        sqlx::query(
            "UPDATE project_candidates \
             SET embedding = $1, updated_at = NOW() \
             WHERE project_id = $2 AND video_id = $3",
        )
        .bind(encode_embedding(vector))
        .bind(project_id)
        .bind(video_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
