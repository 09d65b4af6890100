//! Postgres-backed [`ProjectStore`].

use nichescout_core::{
    AnalysisResult, Candidate, ConceptDraft, ProjectStatus, ProjectStore, ResearchProject,
    StoreError,
};
use sqlx::PgPool;

use crate::{artifacts, candidates, projects, DbError};

#[derive(Debug, Clone)]
pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn not_found_as(project_id: i64) -> impl FnOnce(DbError) -> StoreError {
    move |err| match err {
        DbError::NotFound => StoreError::ProjectNotFound(project_id),
        other => StoreError::from(other),
    }
}

impl ProjectStore for PgProjectStore {
    async fn load_project(&self, project_id: i64) -> Result<ResearchProject, StoreError> {
        let row = projects::get_project(&self.pool, project_id)
            .await?
            .ok_or(StoreError::ProjectNotFound(project_id))?;
        Ok(ResearchProject::try_from(row)?)
    }

    async fn update_status(
        &self,
        project_id: i64,
        status: ProjectStatus,
    ) -> Result<(), StoreError> {
        projects::update_project_status(&self.pool, project_id, status)
            .await
            .map_err(not_found_as(project_id))
    }

    async fn load_candidates(&self, project_id: i64) -> Result<Vec<Candidate>, StoreError> {
        Ok(candidates::load_candidates(&self.pool, project_id).await?)
    }

    async fn replace_candidates(
        &self,
        project_id: i64,
        candidates: &[Candidate],
    ) -> Result<(), StoreError> {
        Ok(candidates::replace_candidates(&self.pool, project_id, candidates).await?)
    }

    async fn save_embeddings(
        &self,
        project_id: i64,
        embeddings: &[(String, Vec<f32>)],
    ) -> Result<(), StoreError> {
        Ok(candidates::save_embeddings(&self.pool, project_id, embeddings).await?)
    }

    async fn load_concept(&self, project_id: i64) -> Result<Option<ConceptDraft>, StoreError> {
        Ok(artifacts::load_concept(&self.pool, project_id).await?)
    }

    async fn save_concept(
        &self,
        project_id: i64,
        concept: &ConceptDraft,
    ) -> Result<(), StoreError> {
        Ok(artifacts::save_concept(&self.pool, project_id, concept).await?)
    }

    async fn load_analysis(&self, project_id: i64) -> Result<Option<AnalysisResult>, StoreError> {
        Ok(artifacts::load_analysis(&self.pool, project_id).await?)
    }

    async fn save_analysis(
        &self,
        project_id: i64,
        analysis: &AnalysisResult,
    ) -> Result<(), StoreError> {
        Ok(artifacts::save_analysis(&self.pool, project_id, analysis).await?)
    }

    async fn clear_analysis(&self, project_id: i64) -> Result<(), StoreError> {
        Ok(artifacts::clear_analysis(&self.pool, project_id).await?)
    }
}
