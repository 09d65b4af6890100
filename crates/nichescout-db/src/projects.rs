//! Database operations for the `research_projects` table.

use chrono::{DateTime, Utc};
use nichescout_core::{CoreError, ProjectDefinition, ProjectStatus, ResearchProject};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PROJECT_COLUMNS: &str = "id, public_id, name, niche_query, country_code, candidate_limit, \
     time_window, status, source_video_id, created_at, updated_at";

/// A row from the `research_projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub niche_query: String,
    pub country_code: String,
    pub candidate_limit: i32,
    pub time_window: String,
    pub status: String,
    pub source_video_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for ResearchProject {
    type Error = CoreError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(ResearchProject {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            niche_query: row.niche_query,
            country_code: row.country_code.trim().to_string(),
            candidate_limit: u32::try_from(row.candidate_limit).unwrap_or(0),
            time_window: row.time_window.parse()?,
            status: row.status.parse()?,
            source_video_id: row.source_video_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insert a new project in `draft` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate name).
pub async fn create_project(
    pool: &PgPool,
    definition: &ProjectDefinition,
) -> Result<ProjectRow, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "INSERT INTO research_projects \
             (name, niche_query, country_code, candidate_limit, time_window, source_video_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(definition.name.trim())
    .bind(definition.niche_query.trim())
    .bind(definition.country_code.to_ascii_uppercase())
    .bind(i32::try_from(definition.candidate_limit).unwrap_or(i32::MAX))
    .bind(definition.time_window.as_str())
    .bind(&definition.source_video_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// All projects, most recently updated first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_projects(pool: &PgPool) -> Result<Vec<ProjectRow>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM research_projects ORDER BY updated_at DESC, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single project by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_project(pool: &PgPool, project_id: i64) -> Result<Option<ProjectRow>, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM research_projects WHERE id = $1"
    ))
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Persist a new pipeline status.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no project has `project_id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_project_status(
    pool: &PgPool,
    project_id: i64,
    status: ProjectStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE research_projects \
         SET status = $1, updated_at = NOW() \
         WHERE id = $2",
    )
    .bind(status.as_str())
    .bind(project_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
