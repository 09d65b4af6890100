//! Contract for reading and writing a project's persisted artifacts.

use std::future::Future;

use thiserror::Error;

use crate::analysis::{AnalysisResult, ConceptDraft};
use crate::candidate::Candidate;
use crate::project::{ProjectStatus, ResearchProject};
use crate::CoreError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project {0} not found")]
    ProjectNotFound(i64),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persisted per-stage artifacts of a research project.
///
/// Implementations must keep candidate order exactly as written by
/// [`ProjectStore::replace_candidates`] and must return embeddings already
/// normalized through [`crate::decode_embedding`].
pub trait ProjectStore: Send + Sync {
    fn load_project(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<ResearchProject, StoreError>> + Send;

    fn update_status(
        &self,
        project_id: i64,
        status: ProjectStatus,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Candidates in ranking order.
    fn load_candidates(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Vec<Candidate>, StoreError>> + Send;

    /// Replace the whole candidate set; nothing from the previous set survives.
    fn replace_candidates(
        &self,
        project_id: i64,
        candidates: &[Candidate],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Attach embeddings to existing candidates, keyed by video id.
    fn save_embeddings(
        &self,
        project_id: i64,
        embeddings: &[(String, Vec<f32>)],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_concept(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Option<ConceptDraft>, StoreError>> + Send;

    fn save_concept(
        &self,
        project_id: i64,
        concept: &ConceptDraft,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_analysis(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Option<AnalysisResult>, StoreError>> + Send;

    fn save_analysis(
        &self,
        project_id: i64,
        analysis: &AnalysisResult,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn clear_analysis(&self, project_id: i64)
        -> impl Future<Output = Result<(), StoreError>> + Send;
}
