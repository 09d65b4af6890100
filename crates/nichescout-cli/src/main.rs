mod progress;
mod project;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::project::ProjectCommands;

#[derive(Debug, Parser)]
#[command(name = "nichescout-cli")]
#[command(about = "NicheScout competitive research command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage research projects and run pipeline stages
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert projects from the projects file
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("nichescout-cli: run with --help to list commands");
        return Ok(());
    };

    let config = nichescout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool = nichescout_db::connect_pool_from_config(&config).await?;

    match command {
        Commands::Db { command } => run_db(&pool, &config, command).await,
        Commands::Project { command } => project::run(pool, &config, command).await,
    }
}

async fn run_db(
    pool: &sqlx::PgPool,
    config: &nichescout_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            nichescout_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = nichescout_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            let file = nichescout_core::load_projects(&config.projects_path)?;
            let count = nichescout_db::seed_projects(pool, &file.projects).await?;
            println!(
                "seeded {count} project(s) from {}",
                config.projects_path.display()
            );
        }
    }
    Ok(())
}
