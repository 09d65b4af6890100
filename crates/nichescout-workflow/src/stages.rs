//! Stage operations.
//!
//! Every operation follows the same shape: `begin` a ticket on the session,
//! run against the store and providers, then `finish` the ticket. Session
//! state (status, exclusion mask, current stage) is only updated when the
//! ticket is still current.

use chrono::Utc;
use nichescout_core::{
    AnalysisResult, AppConfig, Candidate, ConceptDraft, ProjectStatus, ProjectStore,
    ResearchProject, ScoringWeights, Suggestions, ANALYSIS_ARTIFACT_VERSION,
};
use nichescout_ranking::{match_concept, score_candidates, ScoringOptions, TextEmbedder};
use nichescout_youtube::{
    discover_candidates, resolve_details, PlanInput, VideoDetail, VideoDetails, VideoSearch,
};
use serde_json::{json, Value};

use crate::analysis::{
    build_context, parse_description, parse_gaps, parse_patterns, string_list, validation_score,
};
use crate::controller::WorkflowSession;
use crate::error::PipelineError;
use crate::oracle::{AnalysisOracle, OracleCall, OracleRequest};
use crate::progress::{ProgressSink, SilentProgress};
use crate::stage::Stage;

/// Raw hits requested per kept candidate, leaving room for duplicates,
/// unresolvable ids and outliers.
const SEARCH_OVERFETCH_FACTOR: usize = 2;

/// Tunables for stage operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub weights: ScoringWeights,
    pub remove_outliers: bool,
    pub embed_batch_size: usize,
    pub top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            remove_outliers: true,
            embed_batch_size: 5,
            top_k: 10,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            weights: config.scoring_weights,
            remove_outliers: config.remove_outliers,
            embed_batch_size: config.embed_batch_size.max(1),
            top_k: config.top_k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub discovered: usize,
    pub resolved: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub removed: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedSummary {
    /// Candidates that received a new embedding in this invocation.
    pub embedded: usize,
    /// Candidates that already had one and were left alone.
    pub skipped: usize,
    /// Candidates whose returned vector was unusable.
    pub rejected: usize,
}

/// Read-only view served at VALIDATION.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationView {
    pub analysis: AnalysisResult,
    /// Top-matched candidates, in match order.
    pub top_candidates: Vec<Candidate>,
}

/// Runs stage operations for a store and a set of providers.
///
/// The video provider and the oracle are optional so that a missing
/// credential surfaces as a stage-level configuration error rather than
/// preventing the whole workflow from starting.
pub struct Pipeline<S, Y, E, O> {
    store: S,
    youtube: Option<Y>,
    embedder: E,
    oracle: Option<O>,
    settings: PipelineSettings,
    progress: Box<dyn ProgressSink>,
}

impl<S, Y, E, O> Pipeline<S, Y, E, O>
where
    S: ProjectStore,
    Y: VideoSearch + VideoDetails,
    E: TextEmbedder,
    O: AnalysisOracle,
{
    #[must_use]
    pub fn new(
        store: S,
        youtube: Option<Y>,
        embedder: E,
        oracle: Option<O>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            youtube,
            embedder,
            oracle,
            settings,
            progress: Box::new(SilentProgress),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    // -- SEARCH ---------------------------------------------------------------

    /// Discover, resolve and score candidates, replacing the persisted set.
    ///
    /// Clears the persisted analysis and, on success, the exclusion mask.
    ///
    /// # Errors
    ///
    /// `Configuration` without a video provider, `External` for provider
    /// failures, `EmptyResult` when nothing survives.
    pub async fn search(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<SearchSummary, PipelineError> {
        let ticket = session.begin(Stage::Search)?;
        self.progress.stage_started(Stage::Search);
        let project = session.project().clone();

        let outcome = {
            let mut on_batch = |done: usize, total: usize| {
                session.report_progress(&ticket, done, total);
                self.progress.batch_done(Stage::Search, done, total);
            };
            self.run_search(&project, &mut on_batch).await
        };

        let summary = session.finish(ticket, outcome);
        self.report_finished(session, Stage::Search);
        let summary = summary?;
        session.set_status(ProjectStatus::Searched);
        session.clear_exclusions();
        Ok(summary)
    }

    async fn run_search(
        &self,
        project: &ResearchProject,
        on_batch: &mut (dyn FnMut(usize, usize) + Send),
    ) -> Result<SearchSummary, PipelineError> {
        let youtube = self.youtube.as_ref().ok_or_else(|| {
            PipelineError::Configuration(
                "YouTube API key is not configured (set YOUTUBE_API_KEY)".to_string(),
            )
        })?;

        let source = match project.source_video_id.as_deref() {
            Some(id) => self.source_video(youtube, id).await?,
            None => None,
        };

        let now = Utc::now();
        let limit = project.candidate_limit as usize;
        let input = PlanInput {
            niche_query: project.niche_query.clone(),
            tags: source.as_ref().map(|s| s.tags.clone()).unwrap_or_default(),
            region_code: Some(project.country_code.clone()),
            published_after: project.time_window.lower_bound(now),
            desired: limit.saturating_mul(SEARCH_OVERFETCH_FACTOR),
        };

        let mut hits = discover_candidates(youtube, &input).await?;
        if let Some(source_id) = project.source_video_id.as_deref() {
            hits.retain(|h| h.video_id != source_id);
        }
        let discovered = hits.len();
        if hits.is_empty() {
            return Err(PipelineError::EmptyResult(format!(
                "no videos found for '{}'",
                project.niche_query
            )));
        }

        let ids: Vec<String> = hits.into_iter().map(|h| h.video_id).collect();
        let details = resolve_details(youtube, &ids, |done, total| on_batch(done, total)).await?;
        let resolved = details.len();
        if details.is_empty() {
            return Err(PipelineError::EmptyResult(
                "no video details could be resolved".to_string(),
            ));
        }

        let options = ScoringOptions {
            weights: self.settings.weights,
            source_tags: source.as_ref().map(|s| s.tags.clone()).unwrap_or_default(),
            source_category: source.and_then(|s| s.category_id),
            remove_outliers: self.settings.remove_outliers,
            limit,
        };
        let candidates: Vec<Candidate> = details.into_iter().map(Candidate::from).collect();
        let scored = score_candidates(candidates, &options, now);

        self.store.replace_candidates(project.id, &scored).await?;
        self.store.clear_analysis(project.id).await?;
        self.store
            .update_status(project.id, ProjectStatus::Searched)
            .await?;

        tracing::info!(
            project_id = project.id,
            discovered,
            resolved,
            kept = scored.len(),
            "search stage complete"
        );
        Ok(SearchSummary {
            discovered,
            resolved,
            kept: scored.len(),
        })
    }

    async fn source_video(
        &self,
        youtube: &Y,
        video_id: &str,
    ) -> Result<Option<VideoDetail>, PipelineError> {
        let mut details = youtube.video_details(&[video_id.to_string()]).await?;
        if details.is_empty() {
            tracing::warn!(video_id, "source video not found; searching without its tags");
        }
        Ok(details.pop())
    }

    // -- FILTER ---------------------------------------------------------------

    /// Apply the session's exclusion mask to the persisted set and advance
    /// to EMBED. The mask is consumed.
    ///
    /// # Errors
    ///
    /// `EmptyResult` when the mask would exclude every candidate; the stage
    /// does not advance.
    pub async fn apply_filter(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<FilterSummary, PipelineError> {
        let ticket = session.begin(Stage::Filter)?;
        self.progress.stage_started(Stage::Filter);
        let project = session.project().clone();
        let excluded: Vec<String> = session.excluded().iter().cloned().collect();

        let outcome = self.run_filter(&project, &excluded).await;
        let summary = session.finish(ticket, outcome);
        self.report_finished(session, Stage::Filter);
        let (summary, status) = summary?;

        session.set_status(status);
        session.clear_exclusions();
        session.advance()?;
        Ok(summary)
    }

    async fn run_filter(
        &self,
        project: &ResearchProject,
        excluded: &[String],
    ) -> Result<(FilterSummary, ProjectStatus), PipelineError> {
        let candidates = self.store.load_candidates(project.id).await?;
        if candidates.is_empty() {
            return Err(PipelineError::EmptyResult(
                "no candidates to filter; run search first".to_string(),
            ));
        }

        let before = candidates.len();
        let remaining: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !excluded.contains(&c.video_id))
            .collect();
        let removed = before - remaining.len();
        if remaining.is_empty() {
            return Err(PipelineError::EmptyResult(
                "every candidate is excluded".to_string(),
            ));
        }

        if removed > 0 {
            self.store.replace_candidates(project.id, &remaining).await?;
            self.store.clear_analysis(project.id).await?;
        }
        let status = if removed > 0 || project.status < ProjectStatus::Filtered {
            ProjectStatus::Filtered
        } else {
            project.status
        };
        if status != project.status {
            self.store.update_status(project.id, status).await?;
        }

        tracing::info!(
            project_id = project.id,
            removed,
            remaining = remaining.len(),
            "filter applied"
        );
        Ok((
            FilterSummary {
                removed,
                remaining: remaining.len(),
            },
            status,
        ))
    }

    // -- EMBED ----------------------------------------------------------------

    /// Attach embeddings to candidates in batches, persisting each batch
    /// before the next starts. Without `force` only candidates missing an
    /// embedding are processed, so a failed run resumes where it stopped.
    ///
    /// # Errors
    ///
    /// `EmptyResult` without candidates, `External` for provider failures.
    pub async fn embed(
        &self,
        session: &mut WorkflowSession,
        force: bool,
    ) -> Result<EmbedSummary, PipelineError> {
        let ticket = session.begin(Stage::Embed)?;
        self.progress.stage_started(Stage::Embed);
        let project = session.project().clone();

        let outcome = {
            let mut on_batch = |done: usize, total: usize| {
                session.report_progress(&ticket, done, total);
                self.progress.batch_done(Stage::Embed, done, total);
            };
            self.run_embed(&project, force, &mut on_batch).await
        };

        let summary = session.finish(ticket, outcome);
        self.report_finished(session, Stage::Embed);
        let (summary, status) = summary?;
        session.set_status(status);
        Ok(summary)
    }

    async fn run_embed(
        &self,
        project: &ResearchProject,
        force: bool,
        on_batch: &mut (dyn FnMut(usize, usize) + Send),
    ) -> Result<(EmbedSummary, ProjectStatus), PipelineError> {
        let candidates = self.store.load_candidates(project.id).await?;
        if candidates.is_empty() {
            return Err(PipelineError::EmptyResult(
                "no candidates to embed; run search first".to_string(),
            ));
        }

        let pending: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| force || !c.has_embedding())
            .collect();
        let skipped = candidates.len() - pending.len();
        let total = pending.len();
        let mut embedded = 0;
        let mut rejected = 0;
        let mut done = 0;

        if force && total > 0 {
            self.store.clear_analysis(project.id).await?;
        }

        let batch_size = self.settings.embed_batch_size.max(1);
        for (batch_no, batch) in pending.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.embedding_text()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(PipelineError::External(format!(
                    "embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            let mut pairs = Vec::with_capacity(batch.len());
            for (candidate, vector) in batch.iter().zip(vectors) {
                if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
                    tracing::warn!(
                        video_id = %candidate.video_id,
                        "embedding provider returned an unusable vector; skipping"
                    );
                    rejected += 1;
                    continue;
                }
                pairs.push((candidate.video_id.clone(), vector));
            }
            embedded += pairs.len();
            self.store.save_embeddings(project.id, &pairs).await?;
            if batch_no == 0 && project.status < ProjectStatus::EmbeddingPartial {
                self.store
                    .update_status(project.id, ProjectStatus::EmbeddingPartial)
                    .await?;
            }

            done += batch.len();
            tracing::debug!(project_id = project.id, done, total, "embedding batch persisted");
            on_batch(done, total);
        }

        // Later stages' outputs survive a plain re-run; a forced run drops
        // the analysis, so the status falls back to the saved concept.
        let status = if project.status < ProjectStatus::Embedded {
            ProjectStatus::Embedded
        } else if force && project.status > ProjectStatus::ConceptSaved {
            ProjectStatus::ConceptSaved
        } else {
            project.status
        };
        if status != project.status {
            self.store.update_status(project.id, status).await?;
        }
        tracing::info!(
            project_id = project.id,
            embedded,
            skipped,
            rejected,
            %status,
            "embed stage complete"
        );
        Ok((
            EmbedSummary {
                embedded,
                skipped,
                rejected,
            },
            status,
        ))
    }

    // -- INPUT ----------------------------------------------------------------

    /// Embed and persist the user's concept.
    ///
    /// # Errors
    ///
    /// `EmptyResult` for a concept without a title, `External` for provider
    /// failures.
    pub async fn save_concept(
        &self,
        session: &mut WorkflowSession,
        concept: ConceptDraft,
    ) -> Result<ConceptDraft, PipelineError> {
        let ticket = session.begin(Stage::Input)?;
        self.progress.stage_started(Stage::Input);
        let project = session.project().clone();

        let outcome = self.run_save_concept(&project, concept).await;
        let saved = session.finish(ticket, outcome);
        self.report_finished(session, Stage::Input);
        let saved = saved?;
        session.set_status(ProjectStatus::ConceptSaved);
        Ok(saved)
    }

    async fn run_save_concept(
        &self,
        project: &ResearchProject,
        mut concept: ConceptDraft,
    ) -> Result<ConceptDraft, PipelineError> {
        if concept.title.trim().is_empty() {
            return Err(PipelineError::EmptyResult(
                "concept title must not be empty".to_string(),
            ));
        }

        let mut vectors = self.embedder.embed(&[concept.embedding_text()]).await?;
        let vector = vectors
            .pop()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                PipelineError::External("embedding provider returned no concept vector".into())
            })?;
        concept.embedding = Some(vector);

        self.store.save_concept(project.id, &concept).await?;
        self.store.clear_analysis(project.id).await?;
        self.store
            .update_status(project.id, ProjectStatus::ConceptSaved)
            .await?;
        tracing::info!(project_id = project.id, title = %concept.title, "concept saved");
        Ok(concept)
    }

    // -- ANALYSIS -------------------------------------------------------------

    /// Produce the analysis, or return the persisted one without calling
    /// the oracle.
    ///
    /// # Errors
    ///
    /// `NotFound` without a saved concept, `EmptyResult` when no candidate
    /// has a usable embedding, `Configuration` without an oracle,
    /// `External` for provider failures.
    pub async fn analyze(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<AnalysisResult, PipelineError> {
        let ticket = session.begin(Stage::Analysis)?;
        self.progress.stage_started(Stage::Analysis);
        let project = session.project().clone();

        let outcome = {
            let mut on_batch = |done: usize, total: usize| {
                session.report_progress(&ticket, done, total);
                self.progress.batch_done(Stage::Analysis, done, total);
            };
            self.run_analysis(&project, &mut on_batch).await
        };

        let result = session.finish(ticket, outcome);
        self.report_finished(session, Stage::Analysis);
        let result = result?;
        session.set_status(ProjectStatus::Analyzed);
        Ok(result)
    }

    async fn run_analysis(
        &self,
        project: &ResearchProject,
        on_batch: &mut (dyn FnMut(usize, usize) + Send),
    ) -> Result<AnalysisResult, PipelineError> {
        if let Some(existing) = self.store.load_analysis(project.id).await? {
            tracing::info!(project_id = project.id, "analysis already persisted; reusing");
            if project.status != ProjectStatus::Analyzed {
                self.store
                    .update_status(project.id, ProjectStatus::Analyzed)
                    .await?;
            }
            return Ok(existing);
        }

        let oracle = self.oracle.as_ref().ok_or_else(|| {
            PipelineError::Configuration(
                "oracle API key is not configured (set ORACLE_API_KEY)".to_string(),
            )
        })?;
        let concept = self
            .store
            .load_concept(project.id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("concept for project {}", project.id)))?;
        let candidates = self.store.load_candidates(project.id).await?;
        if candidates.is_empty() {
            return Err(PipelineError::EmptyResult(
                "no candidates to analyse; run search first".to_string(),
            ));
        }

        let matched =
            match_concept(&self.embedder, &concept, &candidates, self.settings.top_k).await?;
        if matched.top_matches.is_empty() {
            return Err(PipelineError::EmptyResult(
                "no candidate has a usable embedding; run embed first".to_string(),
            ));
        }
        if concept.embedding.is_none() {
            let mut with_vector = concept.clone();
            with_vector.embedding = Some(matched.concept_embedding.clone());
            self.store.save_concept(project.id, &with_vector).await?;
        }

        let context = build_context(
            &project.niche_query,
            &concept,
            &matched.top_matches,
            &candidates,
        );
        let total = OracleCall::ALL.len();

        let patterns = self
            .ask(oracle, OracleCall::PatternExtraction, context.clone())
            .await?;
        on_batch(1, total);
        let (pattern_summary, extended) = parse_patterns(patterns);

        let gap_context = with_field(&context, "patterns", pattern_summary.clone());
        let gaps = parse_gaps(
            &self
                .ask(oracle, OracleCall::GapScores, gap_context.clone())
                .await?,
        );
        on_batch(2, total);

        let gaps_json: Vec<Value> = gaps
            .iter()
            .map(|g| json!({"description": g.description, "score": g.score}))
            .collect();
        let suggestion_context = with_field(&gap_context, "gaps", Value::Array(gaps_json));

        let titles = string_list(
            &self
                .ask(oracle, OracleCall::TitleVariants, suggestion_context.clone())
                .await?,
            "titles",
        );
        on_batch(3, total);
        let description = parse_description(
            &self
                .ask(oracle, OracleCall::DescriptionRewrite, suggestion_context.clone())
                .await?,
        );
        on_batch(4, total);
        let tags = string_list(
            &self
                .ask(oracle, OracleCall::TagSuggestions, suggestion_context)
                .await?,
            "tags",
        );
        on_batch(5, total);

        let result = AnalysisResult {
            version: ANALYSIS_ARTIFACT_VERSION,
            top_matches: matched.top_matches,
            pattern_summary,
            validation_score: validation_score(&gaps),
            gaps,
            suggestions: Suggestions {
                title_variants: titles,
                description,
                tags,
            },
            extended,
            created_at: Utc::now(),
        };

        self.store.save_analysis(project.id, &result).await?;
        self.store
            .update_status(project.id, ProjectStatus::Analyzed)
            .await?;
        tracing::info!(
            project_id = project.id,
            matches = result.top_matches.len(),
            gaps = result.gaps.len(),
            validation_score = result.validation_score,
            "analysis stage complete"
        );
        Ok(result)
    }

    /// One oracle call. Malformed JSON degrades to `null` so the caller's
    /// parser yields empty values; every other failure fails the stage.
    async fn ask(
        &self,
        oracle: &O,
        call: OracleCall,
        context: Value,
    ) -> Result<Value, PipelineError> {
        let request = OracleRequest::new(call, context);
        match oracle.complete(&request).await.map_err(PipelineError::from) {
            Ok(value) => Ok(value),
            Err(PipelineError::Parse(message)) => {
                tracing::warn!(%call, error = %message, "discarding malformed oracle output");
                Ok(Value::Null)
            }
            Err(other) => Err(other),
        }
    }

    // -- VALIDATION -----------------------------------------------------------

    /// Read-only view of the persisted analysis.
    ///
    /// # Errors
    ///
    /// `NotFound` when no analysis is persisted.
    pub async fn validation_view(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<ValidationView, PipelineError> {
        let ticket = session.begin(Stage::Validation)?;
        let project_id = session.project().id;

        let outcome = async {
            let analysis = self
                .store
                .load_analysis(project_id)
                .await?
                .ok_or_else(|| {
                    PipelineError::NotFound(format!("analysis for project {project_id}"))
                })?;
            let candidates = self.store.load_candidates(project_id).await?;
            let top_candidates = analysis
                .top_matches
                .iter()
                .filter_map(|m| candidates.iter().find(|c| c.video_id == m.video_id).cloned())
                .collect();
            Ok::<_, PipelineError>(ValidationView {
                analysis,
                top_candidates,
            })
        }
        .await;

        session.finish(ticket, outcome)
    }

    fn report_finished(&self, session: &WorkflowSession, stage: Stage) {
        self.progress
            .stage_finished(stage, &session.stage_state(stage));
    }
}

fn with_field(base: &Value, key: &str, value: Value) -> Value {
    let mut out = base.clone();
    if let Value::Object(map) = &mut out {
        map.insert(key.to_string(), value);
    }
    out
}
