use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use nichescout_core::{AnalysisResult, Candidate, CandidateMetrics, ResearchProject};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ProjectItem {
    id: i64,
    public_id: Uuid,
    name: String,
    niche_query: String,
    country_code: String,
    candidate_limit: u32,
    time_window: &'static str,
    status: &'static str,
    next_stage: &'static str,
    source_video_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResearchProject> for ProjectItem {
    fn from(project: ResearchProject) -> Self {
        Self {
            id: project.id,
            public_id: project.public_id,
            name: project.name,
            niche_query: project.niche_query,
            country_code: project.country_code,
            candidate_limit: project.candidate_limit,
            time_window: project.time_window.as_str(),
            status: project.status.as_str(),
            next_stage: nichescout_workflow::stage_for_status(project.status).as_str(),
            source_video_id: project.source_video_id,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Candidate as exposed over the API. The embedding vector is reduced to a
/// presence flag.
#[derive(Debug, Serialize)]
pub(super) struct CandidateItem {
    rank: usize,
    video_id: String,
    title: String,
    channel_id: String,
    channel_title: String,
    thumbnail_url: Option<String>,
    view_count: u64,
    like_count: u64,
    comment_count: u64,
    duration_seconds: u64,
    published_at: DateTime<Utc>,
    metrics: CandidateMetrics,
    has_embedding: bool,
}

impl CandidateItem {
    fn from_candidate(rank: usize, candidate: Candidate) -> Self {
        Self {
            rank,
            has_embedding: candidate.has_embedding(),
            video_id: candidate.video_id,
            title: candidate.title,
            channel_id: candidate.channel_id,
            channel_title: candidate.channel_title,
            thumbnail_url: candidate.thumbnail_url,
            view_count: candidate.view_count,
            like_count: candidate.like_count,
            comment_count: candidate.comment_count,
            duration_seconds: candidate.duration_seconds,
            published_at: candidate.published_at,
            metrics: candidate.metrics,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidateQuery {
    pub limit: Option<i64>,
}

fn to_project(
    request_id: &str,
    row: nichescout_db::ProjectRow,
) -> Result<ResearchProject, ApiError> {
    ResearchProject::try_from(row).map_err(|e| {
        tracing::error!(error = %e, "stored project failed to decode");
        ApiError::new(request_id, "internal_error", "stored project is invalid")
    })
}

/// Fetch the project or produce a 404.
async fn require_project(
    state: &AppState,
    request_id: &str,
    project_id: i64,
) -> Result<ResearchProject, ApiError> {
    let row = nichescout_db::get_project(&state.pool, project_id)
        .await
        .map_err(|e| map_db_error(request_id.to_string(), &e))?
        .ok_or_else(|| ApiError::project_not_found(request_id.to_string(), project_id))?;
    to_project(request_id, row)
}

pub(super) async fn list_projects(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProjectItem>>>, ApiError> {
    let rows = nichescout_db::list_projects(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| to_project(&req_id.0, row).map(ProjectItem::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_project(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<i64>,
) -> Result<Json<ApiResponse<ProjectItem>>, ApiError> {
    let project = require_project(&state, &req_id.0, project_id).await?;

    Ok(Json(ApiResponse {
        data: ProjectItem::from(project),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_candidates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<i64>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<ApiResponse<Vec<CandidateItem>>>, ApiError> {
    require_project(&state, &req_id.0, project_id).await?;

    let candidates = nichescout_db::load_candidates(&state.pool, project_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = candidates
        .into_iter()
        .take(normalize_limit(query.limit))
        .enumerate()
        .map(|(index, candidate)| CandidateItem::from_candidate(index + 1, candidate))
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<i64>,
) -> Result<Json<ApiResponse<AnalysisResult>>, ApiError> {
    require_project(&state, &req_id.0, project_id).await?;

    let analysis = nichescout_db::load_analysis(&state.pool, project_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("project {project_id} has no analysis yet"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: analysis,
        meta: ResponseMeta::new(req_id.0),
    }))
}
