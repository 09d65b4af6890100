use nichescout_core::{AppConfig, ConceptDraft};
use nichescout_db::PgProjectStore;
use nichescout_ranking::EmbeddingClient;
use nichescout_workflow::{
    ChatOracle, OracleError, Pipeline, PipelineSettings, Stage, WorkflowSession,
};
use nichescout_youtube::YoutubeClient;
use sqlx::PgPool;

use crate::progress::LogProgress;

type CliPipeline = Pipeline<PgProjectStore, YoutubeClient, EmbeddingClient, ChatOracle>;

/// Build the pipeline from config. Missing YouTube or oracle keys leave that
/// provider unset so only the stages that need it fail.
fn build_pipeline(pool: PgPool, config: &AppConfig) -> anyhow::Result<CliPipeline> {
    let youtube = match YoutubeClient::from_config(config) {
        Ok(client) => Some(client),
        Err(e) if e.is_configuration() => {
            tracing::debug!(error = %e, "YouTube client not configured");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let oracle = match ChatOracle::from_config(config) {
        Ok(oracle) => Some(oracle),
        Err(OracleError::MissingApiKey) => None,
        Err(e) => return Err(e.into()),
    };
    let embedder = EmbeddingClient::from_config(config)?;

    Ok(Pipeline::new(
        PgProjectStore::new(pool),
        youtube,
        embedder,
        oracle,
        PipelineSettings::from_config(config),
    )
    .with_progress(Box::new(LogProgress)))
}

/// Resume the project's session and move it to `stage`.
async fn session_at(
    pipeline: &CliPipeline,
    id: i64,
    stage: Stage,
) -> anyhow::Result<WorkflowSession> {
    let mut session = WorkflowSession::resume(pipeline.store(), id).await?;
    session.navigate(stage).map_err(|e| {
        anyhow::anyhow!(
            "{e}; project {id} is at '{}' (status {})",
            session.current_stage(),
            session.project().status
        )
    })?;
    Ok(session)
}

pub(crate) async fn run_search(pool: PgPool, config: &AppConfig, id: i64) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool, config)?;
    let mut session = session_at(&pipeline, id, Stage::Search).await?;
    let summary = pipeline.search(&mut session).await?;
    println!(
        "search: {} discovered, {} resolved, {} kept",
        summary.discovered, summary.resolved, summary.kept
    );
    Ok(())
}

pub(crate) async fn run_filter(
    pool: PgPool,
    config: &AppConfig,
    id: i64,
    exclude: Vec<String>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool, config)?;
    let mut session = session_at(&pipeline, id, Stage::Filter).await?;
    for video_id in exclude {
        session.exclude(video_id);
    }
    let summary = pipeline.apply_filter(&mut session).await?;
    println!(
        "filter: removed {}, {} remaining",
        summary.removed, summary.remaining
    );
    Ok(())
}

pub(crate) async fn run_embed(
    pool: PgPool,
    config: &AppConfig,
    id: i64,
    force: bool,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool, config)?;
    let mut session = session_at(&pipeline, id, Stage::Embed).await?;
    let summary = pipeline.embed(&mut session, force).await?;
    println!(
        "embed: {} embedded, {} already present, {} rejected",
        summary.embedded, summary.skipped, summary.rejected
    );
    Ok(())
}

pub(crate) async fn run_concept(
    pool: PgPool,
    config: &AppConfig,
    id: i64,
    concept: ConceptDraft,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool, config)?;
    let mut session = session_at(&pipeline, id, Stage::Input).await?;
    let saved = pipeline.save_concept(&mut session, concept).await?;
    println!("concept saved: {}", saved.title);
    Ok(())
}

pub(crate) async fn run_analyze(pool: PgPool, config: &AppConfig, id: i64) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool, config)?;
    let mut session = session_at(&pipeline, id, Stage::Analysis).await?;
    let analysis = pipeline.analyze(&mut session).await?;
    println!(
        "analysis: {} direct competitors, {} gaps, validation score {:.1}",
        analysis.top_matches.len(),
        analysis.gaps.len(),
        analysis.validation_score
    );
    Ok(())
}

pub(crate) async fn run_report(pool: PgPool, config: &AppConfig, id: i64) -> anyhow::Result<()> {
    let pipeline = build_pipeline(pool, config)?;
    let mut session = session_at(&pipeline, id, Stage::Validation).await?;
    let view = pipeline.validation_view(&mut session).await?;
    print!("{}", super::report::render_markdown(session.project(), &view));
    Ok(())
}
