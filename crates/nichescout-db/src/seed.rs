use nichescout_core::ProjectDefinition;
use sqlx::PgPool;

use crate::DbError;

/// Upsert projects from config into the database, keyed by name.
///
/// Existing projects keep their status and artifacts; only their definition
/// fields are refreshed. Returns the number of projects processed. All
/// upserts run inside a single transaction; if any operation fails the
/// entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_projects(
    pool: &PgPool,
    projects: &[ProjectDefinition],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for project in projects {
        sqlx::query(
            "INSERT INTO research_projects \
                 (name, niche_query, country_code, candidate_limit, time_window, source_video_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (name) DO UPDATE SET \
                 niche_query = EXCLUDED.niche_query, \
                 country_code = EXCLUDED.country_code, \
                 candidate_limit = EXCLUDED.candidate_limit, \
                 time_window = EXCLUDED.time_window, \
                 source_video_id = EXCLUDED.source_video_id, \
                 updated_at = NOW()",
        )
        .bind(project.name.trim())
        .bind(project.niche_query.trim())
        .bind(project.country_code.to_ascii_uppercase())
        .bind(i32::try_from(project.candidate_limit).unwrap_or(i32::MAX))
        .bind(project.time_window.as_str())
        .bind(&project.source_video_id)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
