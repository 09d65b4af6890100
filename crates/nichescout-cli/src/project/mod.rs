//! Project command handlers for the CLI.
//!
//! Management commands (`create`, `list`, `status`) talk to the database
//! directly. Stage commands resume a workflow session for the project,
//! move it to the requested stage under the usual navigation rules and run
//! that stage once.

mod manage;
mod report;
mod stages;

use clap::Subcommand;
use nichescout_core::{AppConfig, TimeWindow};
use sqlx::PgPool;

/// Sub-commands available under `project`.
#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    /// Create a project in draft status
    Create {
        /// Unique project name
        #[arg(long)]
        name: String,
        /// Niche phrase used as the primary search query
        #[arg(long)]
        niche: String,
        /// Two-letter region code for search
        #[arg(long, default_value = "US")]
        country: String,
        /// Number of candidates to keep after scoring
        #[arg(long, default_value_t = 50)]
        limit: u32,
        /// Publish window: week, month, quarter, year or all
        #[arg(long, default_value = "year")]
        window: TimeWindow,
        /// Video whose tags and category seed the search
        #[arg(long)]
        source_video: Option<String>,
    },
    /// List projects
    List,
    /// Show a project's status and artifact counts
    Status { id: i64 },
    /// Discover and score competitor videos
    Search { id: i64 },
    /// Remove candidates by video id and move on to embedding
    Filter {
        id: i64,
        /// Video id to exclude; repeatable
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },
    /// Embed candidates that do not have an embedding yet
    Embed {
        id: i64,
        /// Re-embed every candidate
        #[arg(long)]
        force: bool,
    },
    /// Save the concept to validate
    Concept {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Concept tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Run the AI analysis against the saved concept
    Analyze { id: i64 },
    /// Print the analysis as a markdown report
    Report { id: i64 },
}

pub(crate) async fn run(
    pool: PgPool,
    config: &AppConfig,
    command: ProjectCommands,
) -> anyhow::Result<()> {
    match command {
        ProjectCommands::Create {
            name,
            niche,
            country,
            limit,
            window,
            source_video,
        } => {
            let definition = nichescout_core::ProjectDefinition {
                name,
                niche_query: niche,
                country_code: country,
                candidate_limit: limit,
                time_window: window,
                source_video_id: source_video,
            };
            manage::run_create(&pool, &definition).await
        }
        ProjectCommands::List => manage::run_list(&pool).await,
        ProjectCommands::Status { id } => manage::run_status(&pool, id).await,
        ProjectCommands::Search { id } => stages::run_search(pool, config, id).await,
        ProjectCommands::Filter { id, exclude } => {
            stages::run_filter(pool, config, id, exclude).await
        }
        ProjectCommands::Embed { id, force } => stages::run_embed(pool, config, id, force).await,
        ProjectCommands::Concept {
            id,
            title,
            description,
            tags,
        } => {
            let concept = nichescout_core::ConceptDraft::new(title, description, tags);
            stages::run_concept(pool, config, id, concept).await
        }
        ProjectCommands::Analyze { id } => stages::run_analyze(pool, config, id).await,
        ProjectCommands::Report { id } => stages::run_report(pool, config, id).await,
    }
}
