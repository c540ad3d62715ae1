//! Postgres persistence for citescope: projects and keywords, analysis runs
//! with their responses, citations and mentions, and the optimizer's outputs.
//!
//! Multi-row writes run in a single transaction.

use std::time::Duration;

use citescope_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Relative to this crate's manifest: the workspace-level migrations directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Connection pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error("unexpected value '{value}' in column {column}")]
    InvalidColumn { column: &'static str, value: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Open a pool against `database_url` sized by `config`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be acquired.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Open the pool described by `DATABASE_URL` and the `CITESCOPE_DB_*` sizes.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] for offline configs and
/// [`DbError::Sqlx`] when the database is unreachable.
pub async fn connect_pool_from_config(config: &AppConfig) -> Result<PgPool, DbError> {
    let Some(database_url) = config.database_url.as_deref() else {
        return Err(DbError::MissingDatabaseUrl);
    };
    let pool = connect_pool(database_url, PoolConfig::from_app_config(config)).await?;
    Ok(pool)
}

/// Successful rows in sqlx's bookkeeping table; zero before the first run
/// creates it.
async fn applied_migration_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Apply pending migrations and report how many were new.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if a migration fails or the
/// applied history no longer matches the files on disk.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_migration_count(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_migration_count(pool).await;
    Ok(usize::try_from(after.saturating_sub(before)).unwrap_or(0))
}

/// Round-trip a trivial query to prove the pool can reach the server.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_keeps_one_warm_connection() {
        let config = PoolConfig::default();
        assert_eq!(config.min_connections, 1);
        assert!(config.max_connections >= config.min_connections);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn column_errors_name_the_column() {
        let err = DbError::InvalidColumn {
            column: "gap_type",
            value: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected value 'bogus' in column gap_type");
    }
}

pub mod analysis;
mod convert;
pub mod gaps;
pub mod projects;
pub mod recommendations;
pub mod runs;
pub mod scores;

pub use analysis::{load_cited_keyword_ids, load_run_rows, RunRows};
pub use gaps::{
    list_content_gaps, sync_content_gaps, upsert_content_gap, ContentGapRow, GapSync,
};
pub use projects::{
    get_project_by_slug, list_active_keywords, list_competitors, list_projects, seed_projects,
    CompetitorRow, ProjectRow,
};
pub use recommendations::{
    expire_recommendations, list_active_recommendations, list_expirable_recommendations,
    replace_run_recommendations, RecommendationRow,
};
pub use runs::{
    complete_run, create_run, fail_run, latest_completed_runs, persist_response, RunRow,
};
pub use scores::{latest_scores, replace_run_score, OptimizationScoreRow};
