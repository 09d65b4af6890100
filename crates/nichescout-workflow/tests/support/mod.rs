//! In-memory store and scripted providers for workflow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use nichescout_core::{
    AnalysisResult, Candidate, ConceptDraft, ProjectStatus, ProjectStore, ResearchProject,
    StoreError, TimeWindow,
};
use nichescout_ranking::{RankingError, TextEmbedder};
use nichescout_workflow::{AnalysisOracle, OracleCall, OracleError, OracleRequest};
use nichescout_youtube::{
    SearchPage, SearchRequest, VideoDetail, VideoDetails, VideoHit, VideoSearch, YoutubeError,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Record {
    project: Option<ResearchProject>,
    candidates: Vec<Candidate>,
    concept: Option<ConceptDraft>,
    analysis: Option<AnalysisResult>,
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<i64, Record>>,
    status_history: Mutex<Vec<ProjectStatus>>,
    /// Fail `save_embeddings` once this many calls have succeeded.
    pub fail_embedding_save_after: Mutex<Option<usize>>,
    embedding_saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with_project(project: ResearchProject) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(
            project.id,
            Record {
                project: Some(project),
                ..Record::default()
            },
        );
        store
    }

    pub fn status(&self, id: i64) -> ProjectStatus {
        self.records.lock().unwrap()[&id]
            .project
            .as_ref()
            .unwrap()
            .status
    }

    pub fn status_history(&self) -> Vec<ProjectStatus> {
        self.status_history.lock().unwrap().clone()
    }

    pub fn candidates(&self, id: i64) -> Vec<Candidate> {
        self.records.lock().unwrap()[&id].candidates.clone()
    }

    pub fn analysis(&self, id: i64) -> Option<AnalysisResult> {
        self.records.lock().unwrap()[&id].analysis.clone()
    }

    pub fn put_candidates(&self, id: i64, candidates: Vec<Candidate>) {
        self.records.lock().unwrap().get_mut(&id).unwrap().candidates = candidates;
    }

    pub fn put_analysis(&self, id: i64, analysis: AnalysisResult) {
        self.records.lock().unwrap().get_mut(&id).unwrap().analysis = Some(analysis);
    }

    pub fn put_concept(&self, id: i64, concept: ConceptDraft) {
        self.records.lock().unwrap().get_mut(&id).unwrap().concept = Some(concept);
    }

    fn with_record<T>(
        &self,
        id: i64,
        f: impl FnOnce(&mut Record) -> T,
    ) -> Result<T, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .filter(|r| r.project.is_some())
            .ok_or(StoreError::ProjectNotFound(id))?;
        Ok(f(record))
    }
}

impl ProjectStore for MemoryStore {
    async fn load_project(&self, project_id: i64) -> Result<ResearchProject, StoreError> {
        self.with_record(project_id, |r| r.project.clone().unwrap())
    }

    async fn update_status(
        &self,
        project_id: i64,
        status: ProjectStatus,
    ) -> Result<(), StoreError> {
        self.status_history.lock().unwrap().push(status);
        self.with_record(project_id, |r| {
            if let Some(p) = r.project.as_mut() {
                p.status = status;
            }
        })
    }

    async fn load_candidates(&self, project_id: i64) -> Result<Vec<Candidate>, StoreError> {
        self.with_record(project_id, |r| r.candidates.clone())
    }

    async fn replace_candidates(
        &self,
        project_id: i64,
        candidates: &[Candidate],
    ) -> Result<(), StoreError> {
        self.with_record(project_id, |r| r.candidates = candidates.to_vec())
    }

    async fn save_embeddings(
        &self,
        project_id: i64,
        embeddings: &[(String, Vec<f32>)],
    ) -> Result<(), StoreError> {
        let limit = *self.fail_embedding_save_after.lock().unwrap();
        let done = self.embedding_saves.load(Ordering::SeqCst);
        if limit.is_some_and(|l| done >= l) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.embedding_saves.fetch_add(1, Ordering::SeqCst);
        self.with_record(project_id, |r| {
            for (id, vector) in embeddings {
                if let Some(c) = r.candidates.iter_mut().find(|c| &c.video_id == id) {
                    c.embedding = Some(vector.clone());
                }
            }
        })
    }

    async fn load_concept(&self, project_id: i64) -> Result<Option<ConceptDraft>, StoreError> {
        self.with_record(project_id, |r| r.concept.clone())
    }

    async fn save_concept(
        &self,
        project_id: i64,
        concept: &ConceptDraft,
    ) -> Result<(), StoreError> {
        self.with_record(project_id, |r| r.concept = Some(concept.clone()))
    }

    async fn load_analysis(&self, project_id: i64) -> Result<Option<AnalysisResult>, StoreError> {
        self.with_record(project_id, |r| r.analysis.clone())
    }

    async fn save_analysis(
        &self,
        project_id: i64,
        analysis: &AnalysisResult,
    ) -> Result<(), StoreError> {
        self.with_record(project_id, |r| r.analysis = Some(analysis.clone()))
    }

    async fn clear_analysis(&self, project_id: i64) -> Result<(), StoreError> {
        self.with_record(project_id, |r| r.analysis = None)
    }
}

pub fn project(status: ProjectStatus) -> ResearchProject {
    let now = Utc::now();
    ResearchProject {
        id: 7,
        public_id: uuid::Uuid::new_v4(),
        name: "Home espresso".to_string(),
        niche_query: "home espresso setup".to_string(),
        country_code: "US".to_string(),
        candidate_limit: 50,
        time_window: TimeWindow::Year,
        status,
        source_video_id: None,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// video provider
// ---------------------------------------------------------------------------

pub fn detail(id: &str, views: u64) -> VideoDetail {
    VideoDetail {
        video_id: id.to_string(),
        title: format!("Video {id}"),
        description: format!("About {id}"),
        tags: vec!["espresso".to_string(), "coffee".to_string()],
        category_id: Some("26".to_string()),
        channel_id: "UC1".to_string(),
        channel_title: "Barista".to_string(),
        thumbnail_url: None,
        view_count: views,
        like_count: views / 20,
        comment_count: views / 100,
        duration_seconds: 600,
        published_at: Utc::now() - Duration::days(30),
    }
}

/// Serves a fixed id list per query (paged) and details for every id it
/// knows.
#[derive(Default)]
pub struct FakeYoutube {
    pub results: HashMap<String, Vec<String>>,
    pub details: HashMap<String, VideoDetail>,
    pub fail_search: bool,
}

impl FakeYoutube {
    pub fn with_results(query: &str, ids: &[String]) -> Self {
        let mut fake = Self::default();
        fake.results.insert(query.to_string(), ids.to_vec());
        for (i, id) in ids.iter().enumerate() {
            fake.details
                .insert(id.clone(), detail(id, 1_000 + 10 * i as u64));
        }
        fake
    }
}

impl VideoSearch for FakeYoutube {
    async fn search_page(&self, request: &SearchRequest) -> Result<SearchPage, YoutubeError> {
        if self.fail_search {
            return Err(YoutubeError::RateLimited);
        }
        let all = self.results.get(&request.query).cloned().unwrap_or_default();
        let start: usize = request
            .page_token
            .as_deref()
            .map_or(0, |t| t.parse().unwrap());
        let end = (start + request.max_results as usize).min(all.len());
        let hits = all[start..end]
            .iter()
            .map(|id| VideoHit {
                video_id: id.clone(),
                title: format!("Video {id}"),
                description: String::new(),
                channel_id: "UC1".to_string(),
                channel_title: "Barista".to_string(),
                published_at: None,
                thumbnail_url: None,
            })
            .collect();
        Ok(SearchPage {
            hits,
            next_page_token: (end < all.len()).then(|| end.to_string()),
        })
    }
}

impl VideoDetails for FakeYoutube {
    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetail>, YoutubeError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.details.get(id).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// embedder
// ---------------------------------------------------------------------------

/// Deterministic 3-d vectors derived from text length; can fail on a
/// chosen call. Clones share their counters.
#[derive(Clone, Default)]
pub struct FakeEmbedder {
    pub calls: Arc<AtomicUsize>,
    pub batch_sizes: Arc<Mutex<Vec<usize>>>,
    pub fail_on_call: Arc<Mutex<Option<usize>>>,
}

impl FakeEmbedder {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn fail_on(&self, call: Option<usize>) {
        *self.fail_on_call.lock().unwrap() = call;
    }
}

impl TextEmbedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RankingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batch_sizes.lock().unwrap().push(texts.len());
        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return Err(RankingError::RateLimited);
        }
        #[allow(clippy::cast_precision_loss)]
        let vectors = texts
            .iter()
            .map(|t| vec![1.0, t.len() as f32 / 100.0, 0.5])
            .collect();
        Ok(vectors)
    }
}

// ---------------------------------------------------------------------------
// oracle
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct FakeOracle {
    pub calls: Arc<Mutex<Vec<OracleCall>>>,
    pub malformed: Vec<OracleCall>,
}

impl FakeOracle {
    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl AnalysisOracle for FakeOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        self.calls.lock().unwrap().push(request.call);
        if self.malformed.contains(&request.call) {
            let source = serde_json::from_str::<Value>("not json").unwrap_err();
            return Err(OracleError::MalformedJson {
                call: request.call,
                source,
            });
        }
        Ok(match request.call {
            OracleCall::PatternExtraction => json!({
                "summary": "Gear reviews under 10 minutes dominate",
                "hook_patterns": ["Shot timer on screen"]
            }),
            OracleCall::GapScores => json!({
                "gaps": [
                    {"description": "No sub-$300 setups", "score": 80},
                    {"description": "Few milk steaming guides", "score": 60}
                ]
            }),
            OracleCall::TitleVariants => json!({"titles": ["Espresso on a budget"]}),
            OracleCall::DescriptionRewrite => json!({"description": "A budget espresso guide"}),
            OracleCall::TagSuggestions => json!({"tags": ["espresso", "budget"]}),
        })
    }
}

pub fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}
