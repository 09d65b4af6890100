mod support;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use nichescout_core::{
    AnalysisResult, CandidateMatch, ConceptDraft, ProjectStatus, Suggestions,
    ANALYSIS_ARTIFACT_VERSION,
};
use nichescout_workflow::{
    OracleCall, Pipeline, PipelineError, PipelineSettings, ProgressSink, Stage, StageState,
    WorkflowSession,
};
use serde_json::json;
use support::{ids, project, FakeEmbedder, FakeOracle, FakeYoutube, MemoryStore};

const QUERY: &str = "home espresso setup";
const PROJECT_ID: i64 = 7;

type TestPipeline = Pipeline<MemoryStore, FakeYoutube, FakeEmbedder, FakeOracle>;

fn pipeline(
    status: ProjectStatus,
    youtube: Option<FakeYoutube>,
    embedder: FakeEmbedder,
    oracle: Option<FakeOracle>,
) -> TestPipeline {
    Pipeline::new(
        MemoryStore::with_project(project(status)),
        youtube,
        embedder,
        oracle,
        PipelineSettings::default(),
    )
}

fn stored_analysis(video_id: &str) -> AnalysisResult {
    AnalysisResult {
        version: ANALYSIS_ARTIFACT_VERSION,
        top_matches: vec![CandidateMatch {
            video_id: video_id.to_string(),
            similarity: 0.9,
        }],
        pattern_summary: json!({"summary": "stored"}),
        gaps: vec![],
        suggestions: Suggestions::default(),
        validation_score: 0.0,
        extended: None,
        created_at: Utc::now(),
    }
}

/// Run SEARCH from a fresh draft and step to FILTER.
async fn searched(pipeline: &TestPipeline) -> WorkflowSession {
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    session.navigate(Stage::Search).unwrap();
    pipeline.search(&mut session).await.unwrap();
    session.advance().unwrap();
    session
}

#[tokio::test]
async fn full_workflow_reaches_validation() {
    let embedder = FakeEmbedder::default();
    let oracle = FakeOracle::default();
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 60))),
        embedder.clone(),
        Some(oracle.clone()),
    );
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    assert_eq!(session.current_stage(), Stage::Config);

    session.navigate(Stage::Search).unwrap();
    let summary = pipeline.search(&mut session).await.unwrap();
    assert_eq!(summary.discovered, 60);
    assert_eq!(summary.resolved, 60);
    assert_eq!(summary.kept, 50);
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Searched);

    let candidates = pipeline.store().candidates(PROJECT_ID);
    assert!(candidates
        .windows(2)
        .all(|w| w[0].metrics.combined_score >= w[1].metrics.combined_score));

    session.advance().unwrap();
    session.exclude(candidates[0].video_id.clone());
    session.exclude(candidates[1].video_id.clone());
    let filtered = pipeline.apply_filter(&mut session).await.unwrap();
    assert_eq!(filtered.removed, 2);
    assert_eq!(filtered.remaining, 48);
    assert_eq!(session.current_stage(), Stage::Embed);
    assert!(session.excluded().is_empty());
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Filtered);

    let embedded = pipeline.embed(&mut session, false).await.unwrap();
    assert_eq!(embedded.embedded, 48);
    assert_eq!(embedded.skipped, 0);
    assert_eq!(embedder.batch_sizes(), vec![5, 5, 5, 5, 5, 5, 5, 5, 5, 3]);
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Embedded);

    session.advance().unwrap();
    let concept = pipeline
        .save_concept(
            &mut session,
            ConceptDraft::new(
                "Espresso on a budget",
                "A full home setup for under $300",
                vec!["espresso".to_string()],
            ),
        )
        .await
        .unwrap();
    assert!(concept.embedding.is_some());
    assert_eq!(
        pipeline.store().status(PROJECT_ID),
        ProjectStatus::ConceptSaved
    );

    session.advance().unwrap();
    let analysis = pipeline.analyze(&mut session).await.unwrap();
    assert_eq!(oracle.calls(), OracleCall::ALL.to_vec());
    assert_eq!(analysis.top_matches.len(), 10);
    assert_eq!(analysis.gaps.len(), 2);
    assert!((analysis.validation_score - 70.0).abs() < 1e-9);
    assert_eq!(analysis.suggestions.title_variants, vec!["Espresso on a budget"]);
    assert_eq!(
        analysis.suggestions.description.as_deref(),
        Some("A budget espresso guide")
    );
    assert_eq!(analysis.suggestions.tags, vec!["espresso", "budget"]);
    assert!(analysis.extended.is_some());
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Analyzed);

    session.advance().unwrap();
    let view = pipeline.validation_view(&mut session).await.unwrap();
    assert_eq!(view.analysis, analysis);
    assert_eq!(view.top_candidates.len(), 10);
    assert_eq!(view.top_candidates[0].video_id, analysis.top_matches[0].video_id);
}

#[tokio::test]
async fn embed_resumes_after_mid_run_failure() {
    let embedder = FakeEmbedder::default();
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 20))),
        embedder.clone(),
        None,
    );
    let mut session = searched(&pipeline).await;
    pipeline.apply_filter(&mut session).await.unwrap();

    embedder.fail_on(Some(3));
    let err = pipeline.embed(&mut session, false).await.unwrap_err();
    assert!(matches!(err, PipelineError::External(_)));
    assert_eq!(
        pipeline.store().status(PROJECT_ID),
        ProjectStatus::EmbeddingPartial
    );
    assert!(matches!(
        session.stage_state(Stage::Embed),
        StageState::Failed {
            retriable: true,
            ..
        }
    ));
    let persisted = pipeline
        .store()
        .candidates(PROJECT_ID)
        .iter()
        .filter(|c| c.has_embedding())
        .count();
    assert_eq!(persisted, 10);

    embedder.fail_on(None);
    let summary = pipeline.embed(&mut session, false).await.unwrap();
    assert_eq!(summary.embedded, 10);
    assert_eq!(summary.skipped, 10);
    assert_eq!(embedder.batch_sizes(), vec![5, 5, 5, 5, 5]);
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Embedded);
    assert!(pipeline
        .store()
        .candidates(PROJECT_ID)
        .iter()
        .all(|c| c.has_embedding()));
}

#[tokio::test]
async fn forced_embed_reprocesses_everything_and_drops_analysis() {
    let embedder = FakeEmbedder::default();
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 12))),
        embedder.clone(),
        None,
    );
    let mut session = searched(&pipeline).await;
    pipeline.apply_filter(&mut session).await.unwrap();
    pipeline.embed(&mut session, false).await.unwrap();
    pipeline
        .store()
        .put_analysis(PROJECT_ID, stored_analysis("v0"));

    let summary = pipeline.embed(&mut session, true).await.unwrap();
    assert_eq!(summary.embedded, 12);
    assert_eq!(summary.skipped, 0);
    assert!(pipeline.store().analysis(PROJECT_ID).is_none());
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Embedded);
}

/// Run every stage through ANALYSIS for a fresh project.
async fn analyzed(pipeline: &TestPipeline) -> WorkflowSession {
    let mut session = searched(pipeline).await;
    pipeline.apply_filter(&mut session).await.unwrap();
    pipeline.embed(&mut session, false).await.unwrap();
    session.advance().unwrap();
    pipeline
        .save_concept(
            &mut session,
            ConceptDraft::new("Espresso on a budget", "", vec![]),
        )
        .await
        .unwrap();
    session.advance().unwrap();
    pipeline.analyze(&mut session).await.unwrap();
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Analyzed);
    session
}

#[tokio::test]
async fn rerunning_embed_after_analysis_keeps_status() {
    let embedder = FakeEmbedder::default();
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 20))),
        embedder.clone(),
        Some(FakeOracle::default()),
    );
    analyzed(&pipeline).await;
    let calls_before = embedder.call_count();
    let writes_before = pipeline.store().status_history().len();

    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    assert_eq!(session.current_stage(), Stage::Validation);
    session.navigate(Stage::Embed).unwrap();
    let summary = pipeline.embed(&mut session, false).await.unwrap();

    assert_eq!(summary.embedded, 0);
    assert_eq!(summary.skipped, 20);
    assert_eq!(embedder.call_count(), calls_before);
    assert_eq!(session.project().status, ProjectStatus::Analyzed);
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Analyzed);
    assert!(pipeline.store().analysis(PROJECT_ID).is_some());
    assert_eq!(pipeline.store().status_history().len(), writes_before);

    let resumed = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    assert_eq!(resumed.current_stage(), Stage::Validation);
}

#[tokio::test]
async fn forced_embed_after_analysis_falls_back_to_concept() {
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 20))),
        FakeEmbedder::default(),
        Some(FakeOracle::default()),
    );
    let mut session = analyzed(&pipeline).await;
    session.navigate(Stage::Embed).unwrap();

    let summary = pipeline.embed(&mut session, true).await.unwrap();
    assert_eq!(summary.embedded, 20);
    assert!(pipeline.store().analysis(PROJECT_ID).is_none());
    assert_eq!(
        pipeline.store().status(PROJECT_ID),
        ProjectStatus::ConceptSaved
    );

    let resumed = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    assert_eq!(resumed.current_stage(), Stage::Analysis);
}

#[tokio::test]
async fn excluding_every_candidate_does_not_advance() {
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 15))),
        FakeEmbedder::default(),
        None,
    );
    let mut session = searched(&pipeline).await;
    for c in pipeline.store().candidates(PROJECT_ID) {
        session.exclude(c.video_id);
    }

    let err = pipeline.apply_filter(&mut session).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyResult(_)));
    assert_eq!(session.current_stage(), Stage::Filter);
    assert_eq!(session.excluded().len(), 15);
    assert_eq!(pipeline.store().candidates(PROJECT_ID).len(), 15);
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Searched);
}

#[tokio::test]
async fn search_without_video_provider_is_a_configuration_error() {
    let pipeline = pipeline(ProjectStatus::Draft, None, FakeEmbedder::default(), None);
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    session.navigate(Stage::Search).unwrap();

    let err = pipeline.search(&mut session).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(matches!(
        session.stage_state(Stage::Search),
        StageState::Failed {
            retriable: false,
            ..
        }
    ));
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Draft);
    assert_eq!(session.project().status, ProjectStatus::Draft);
}

#[tokio::test]
async fn failed_search_keeps_previous_candidates() {
    let youtube = FakeYoutube {
        fail_search: true,
        ..FakeYoutube::default()
    };
    let pipeline = pipeline(
        ProjectStatus::Searched,
        Some(youtube),
        FakeEmbedder::default(),
        None,
    );
    let previous = vec![support::detail("old", 10)]
        .into_iter()
        .map(nichescout_core::Candidate::from)
        .collect();
    pipeline.store().put_candidates(PROJECT_ID, previous);

    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    session.navigate(Stage::Search).unwrap();
    let err = pipeline.search(&mut session).await.unwrap_err();

    assert!(err.is_retriable());
    assert_eq!(pipeline.store().candidates(PROJECT_ID).len(), 1);
    assert_eq!(pipeline.store().status(PROJECT_ID), ProjectStatus::Searched);
}

#[tokio::test]
async fn rerunning_search_clears_analysis_and_exclusions() {
    let pipeline = pipeline(
        ProjectStatus::Analyzed,
        Some(FakeYoutube::with_results(QUERY, &ids("n", 12))),
        FakeEmbedder::default(),
        None,
    );
    pipeline
        .store()
        .put_analysis(PROJECT_ID, stored_analysis("old"));

    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    assert_eq!(session.current_stage(), Stage::Validation);
    session.navigate(Stage::Search).unwrap();
    session.exclude("n3");

    pipeline.search(&mut session).await.unwrap();

    assert!(pipeline.store().analysis(PROJECT_ID).is_none());
    assert!(session.excluded().is_empty());
    assert_eq!(session.project().status, ProjectStatus::Searched);
    assert_eq!(session.watermark(), Stage::Validation);
    assert!(pipeline
        .store()
        .candidates(PROJECT_ID)
        .iter()
        .all(|c| c.video_id.starts_with('n')));
}

#[tokio::test]
async fn persisted_analysis_is_returned_without_calling_the_oracle() {
    let oracle = FakeOracle::default();
    let pipeline = pipeline(
        ProjectStatus::Analyzed,
        None,
        FakeEmbedder::default(),
        Some(oracle.clone()),
    );
    let stored = stored_analysis("v1");
    pipeline.store().put_analysis(PROJECT_ID, stored.clone());

    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    session.navigate(Stage::Analysis).unwrap();
    let first = pipeline.analyze(&mut session).await.unwrap();
    let second = pipeline.analyze(&mut session).await.unwrap();

    assert_eq!(first, stored);
    assert_eq!(second, stored);
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn malformed_oracle_output_only_empties_that_field() {
    let embedder = FakeEmbedder::default();
    let oracle = FakeOracle {
        malformed: vec![OracleCall::TitleVariants],
        ..FakeOracle::default()
    };
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 12))),
        embedder,
        Some(oracle),
    );
    let mut session = searched(&pipeline).await;
    pipeline.apply_filter(&mut session).await.unwrap();
    pipeline.embed(&mut session, false).await.unwrap();
    session.advance().unwrap();
    pipeline
        .save_concept(
            &mut session,
            ConceptDraft::new("Budget espresso", "", vec![]),
        )
        .await
        .unwrap();
    session.advance().unwrap();

    let analysis = pipeline.analyze(&mut session).await.unwrap();
    assert!(analysis.suggestions.title_variants.is_empty());
    assert_eq!(analysis.suggestions.tags, vec!["espresso", "budget"]);
    assert_eq!(analysis.gaps.len(), 2);
}

#[tokio::test]
async fn analysis_without_concept_is_not_found() {
    let pipeline = pipeline(
        ProjectStatus::ConceptSaved,
        None,
        FakeEmbedder::default(),
        Some(FakeOracle::default()),
    );
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    let err = pipeline.analyze(&mut session).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
    assert_eq!(
        pipeline.store().status(PROJECT_ID),
        ProjectStatus::ConceptSaved
    );
}

#[tokio::test]
async fn blank_concept_title_is_rejected() {
    let embedder = FakeEmbedder::default();
    let pipeline = pipeline(ProjectStatus::Embedded, None, embedder.clone(), None);
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    let err = pipeline
        .save_concept(&mut session, ConceptDraft::new("  ", "desc", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyResult(_)));
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn validation_without_analysis_is_not_found() {
    let pipeline = pipeline(ProjectStatus::Analyzed, None, FakeEmbedder::default(), None);
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    let err = pipeline.validation_view(&mut session).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[tokio::test]
async fn stage_operation_outside_current_stage_is_rejected() {
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::default()),
        FakeEmbedder::default(),
        None,
    );
    let mut session = WorkflowSession::resume(pipeline.store(), PROJECT_ID)
        .await
        .unwrap();
    let err = pipeline.embed(&mut session, false).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            from: Stage::Config,
            to: Stage::Embed
        }
    ));
}

#[tokio::test]
async fn resume_maps_status_and_reports_missing_projects() {
    let store = MemoryStore::with_project(project(ProjectStatus::EmbeddingPartial));
    let session = WorkflowSession::resume(&store, PROJECT_ID).await.unwrap();
    assert_eq!(session.current_stage(), Stage::Embed);

    let err = WorkflowSession::resume(&store, 99).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[derive(Clone, Default)]
struct RecordingProgress {
    events: Arc<Mutex<Vec<String>>>,
}

impl ProgressSink for RecordingProgress {
    fn stage_started(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage}"));
    }

    fn batch_done(&self, stage: Stage, done: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{stage} {done}/{total}"));
    }

    fn stage_finished(&self, stage: Stage, state: &StageState) {
        let outcome = if matches!(state, StageState::Succeeded) {
            "ok"
        } else {
            "failed"
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("finish {stage} {outcome}"));
    }
}

#[tokio::test]
async fn progress_sink_sees_every_embed_batch() {
    let progress = RecordingProgress::default();
    let pipeline = pipeline(
        ProjectStatus::Draft,
        Some(FakeYoutube::with_results(QUERY, &ids("v", 12))),
        FakeEmbedder::default(),
        None,
    )
    .with_progress(Box::new(progress.clone()));
    let mut session = searched(&pipeline).await;
    pipeline.apply_filter(&mut session).await.unwrap();
    progress.events.lock().unwrap().clear();

    pipeline.embed(&mut session, false).await.unwrap();

    assert_eq!(
        *progress.events.lock().unwrap(),
        vec![
            "start embed",
            "embed 5/12",
            "embed 10/12",
            "embed 12/12",
            "finish embed ok",
        ]
    );
    assert_eq!(session.stage_state(Stage::Embed), StageState::Succeeded);
}
