mod analyze;
mod optimize;
mod pipeline;
mod report;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::simulate::DEFAULT_ENGINES;

#[derive(Debug, Parser)]
#[command(name = "citescope")]
#[command(about = "Citation and visibility analytics for AI answer engines")]
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
    /// Extract citations and brand mentions from one saved engine response
    Analyze {
        /// JSON file with `response_text` and optional `structured_citations`
        #[arg(long)]
        file: PathBuf,
        /// Project (by slug) from the projects file to analyze against
        #[arg(long)]
        project: String,
        /// Print the result as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Run the mock answer engine over a project's keywords
    Simulate {
        /// Project to simulate (by slug)
        #[arg(long)]
        project: String,
        /// Probability that the brand is cited for a keyword
        #[arg(long, default_value = "0.5")]
        cite_probability: f64,
        /// Engines to simulate, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_ENGINES.map(String::from))]
        engines: Vec<String>,
        /// Read the project from the projects file and print results without a database
        #[arg(long)]
        offline: bool,
    },
    /// Generate recommendations, content gaps and a score from the latest run
    Optimize {
        /// Project to optimize (by slug)
        #[arg(long)]
        project: String,
        /// Also ask the reasoning service (paid plans with an API key only)
        #[arg(long)]
        ai: bool,
    },
    /// Print a markdown optimization report
    Report {
        /// Project to report on (by slug)
        #[arg(long)]
        project: String,
        /// Maximum recommendations and gaps to list
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check the database connection
    Ping,
    /// Upsert projects, competitors and keywords from the projects file
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = citescope_core::load_app_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("citescope: no command given; try `citescope --help`");
        return Ok(());
    };

    match command {
        Commands::Analyze {
            file,
            project,
            json,
        } => analyze::run_analyze(&config, &file, &project, json),
        Commands::Simulate {
            project,
            cite_probability,
            engines,
            offline,
        } => {
            if offline {
                return simulate::run_simulate_offline(
                    &config,
                    &project,
                    cite_probability,
                    &engines,
                );
            }
            let pool = citescope_db::connect_pool_from_config(&config).await?;
            simulate::run_simulate(&pool, &config, &project, cite_probability, &engines).await
        }
        Commands::Db { command } => {
            let pool = citescope_db::connect_pool_from_config(&config).await?;
            run_db(&pool, &config, command).await
        }
        Commands::Optimize { project, ai } => {
            let pool = citescope_db::connect_pool_from_config(&config).await?;
            optimize::run_optimize(&pool, &config, &project, ai).await
        }
        Commands::Report { project, limit } => {
            let pool = citescope_db::connect_pool_from_config(&config).await?;
            report::run_report(&pool, &config, &project, limit).await
        }
    }
}

async fn run_db(
    pool: &sqlx::PgPool,
    config: &citescope_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let applied = citescope_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            citescope_db::ping(pool).await?;
            println!("database connection ok");
        }
        DbCommands::Seed => {
            let file = citescope_core::load_projects(&config.projects_path)?;
            let seeded = citescope_db::seed_projects(pool, &file.projects).await?;
            println!(
                "seeded {seeded} project(s) from {}",
                config.projects_path.display()
            );
        }
    }
    Ok(())
}

/// Attempt to mark a run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: uuid::Uuid, context: &str) {
    if let Err(mark_err) = citescope_db::fail_run(pool, run_id).await {
        tracing::error!(
            %run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
