//! Database operations for `analysis_runs` and the per-response tables
//! (`engine_responses`, `citations`, `brand_mentions`).

use chrono::{DateTime, Utc};
use citescope_core::{ClassifiedCitation, DetectedMention, Sentiment};
use sqlx::PgPool;
use uuid::Uuid;

use crate::convert::{citation_class_to_columns, position_to_column, to_decimal};
use crate::DbError;

/// A row from the `analysis_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Create a new run with status `running`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_run(pool: &PgPool, project_id: Uuid) -> Result<RunRow, DbError> {
    let row = sqlx::query_as::<_, RunRow>(
        "INSERT INTO analysis_runs (id, project_id, status, started_at) \
         VALUES ($1, $2, 'running', NOW()) \
         RETURNING id, project_id, status, started_at, completed_at, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Mark a run as `completed`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has this id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn complete_run(pool: &PgPool, run_id: Uuid) -> Result<(), DbError> {
    set_terminal_status(pool, run_id, "completed").await
}

/// Mark a run as `failed`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has this id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn fail_run(pool: &PgPool, run_id: Uuid) -> Result<(), DbError> {
    set_terminal_status(pool, run_id, "failed").await
}

async fn set_terminal_status(pool: &PgPool, run_id: Uuid, status: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE analysis_runs \
         SET status = $2, completed_at = NOW() \
         WHERE id = $1",
    )
    .bind(run_id)
    .bind(status)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Most recent completed runs of a project, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_completed_runs(
    pool: &PgPool,
    project_id: Uuid,
    limit: i64,
) -> Result<Vec<RunRow>, DbError> {
    let rows = sqlx::query_as::<_, RunRow>(
        "SELECT id, project_id, status, started_at, completed_at, created_at \
         FROM analysis_runs \
         WHERE project_id = $1 AND status = 'completed' \
         ORDER BY completed_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Store one engine response with its citations and mentions.
///
/// Re-persisting the same `(run, keyword, engine)` replaces the earlier
/// response's text, citations and mentions. Returns the response id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written then.
pub async fn persist_response(
    pool: &PgPool,
    run_id: Uuid,
    keyword_id: Uuid,
    engine: &str,
    response_text: &str,
    citations: &[ClassifiedCitation],
    mentions: &[DetectedMention],
) -> Result<Uuid, DbError> {
    let mut tx = pool.begin().await?;

    let response_id: Uuid = sqlx::query_scalar(
        "INSERT INTO engine_responses (id, run_id, keyword_id, engine, response_text) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (run_id, keyword_id, engine) DO UPDATE SET \
             response_text = EXCLUDED.response_text \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(run_id)
    .bind(keyword_id)
    .bind(engine)
    .bind(response_text)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM citations WHERE response_id = $1")
        .bind(response_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM brand_mentions WHERE response_id = $1")
        .bind(response_id)
        .execute(&mut *tx)
        .await?;

    for citation in citations {
        let (classification, competitor_id) = citation_class_to_columns(citation.classification);
        sqlx::query(
            "INSERT INTO citations \
                 (id, response_id, url, domain, position, classification, competitor_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(response_id)
        .bind(&citation.url)
        .bind(&citation.domain)
        .bind(position_to_column(citation.position))
        .bind(classification)
        .bind(competitor_id)
        .execute(&mut *tx)
        .await?;
    }

    for mention in mentions {
        sqlx::query(
            "INSERT INTO brand_mentions \
                 (id, response_id, mention_type, matched_text, context, confidence, sentiment) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(response_id)
        .bind(mention.mention_type.as_str())
        .bind(&mention.matched_text)
        .bind(&mention.context)
        .bind(to_decimal(mention.confidence.clamp(0.0, 1.0), 3))
        .bind(mention.sentiment.map(Sentiment::as_str))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::debug!(
        %run_id,
        %keyword_id,
        engine,
        citations = citations.len(),
        mentions = mentions.len(),
        "persisted engine response"
    );

    Ok(response_id)
}
