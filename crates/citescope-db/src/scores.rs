use chrono::{DateTime, Utc};
use citescope_core::OptimizationScoreData;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::convert::{to_decimal, to_f64};
use crate::DbError;

/// A row from the `optimization_scores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptimizationScoreRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub run_id: Uuid,
    pub overall_score: Decimal,
    pub content_coverage: Decimal,
    pub competitive_gap: Decimal,
    pub citation_consistency: Decimal,
    pub freshness: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OptimizationScoreRow {
    #[must_use]
    pub fn to_score_data(&self) -> OptimizationScoreData {
        OptimizationScoreData {
            overall_score: to_f64(self.overall_score),
            content_coverage: to_f64(self.content_coverage),
            competitive_gap: to_f64(self.competitive_gap),
            citation_consistency: to_f64(self.citation_consistency),
            freshness: to_f64(self.freshness),
        }
    }
}

/// Store the score snapshot of a run, replacing any earlier snapshot for the
/// same run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn replace_run_score(
    pool: &PgPool,
    project_id: Uuid,
    run_id: Uuid,
    score: &OptimizationScoreData,
) -> Result<Uuid, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM optimization_scores WHERE project_id = $1 AND run_id = $2")
        .bind(project_id)
        .bind(run_id)
        .execute(&mut *tx)
        .await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO optimization_scores \
             (id, project_id, run_id, overall_score, content_coverage, competitive_gap, \
              citation_consistency, freshness) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(project_id)
    .bind(run_id)
    .bind(to_decimal(score.overall_score, 1))
    .bind(to_decimal(score.content_coverage, 1))
    .bind(to_decimal(score.competitive_gap, 1))
    .bind(to_decimal(score.citation_consistency, 1))
    .bind(to_decimal(score.freshness, 1))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Most recent score snapshots of a project, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_scores(
    pool: &PgPool,
    project_id: Uuid,
    limit: i64,
) -> Result<Vec<OptimizationScoreRow>, DbError> {
    let rows = sqlx::query_as::<_, OptimizationScoreRow>(
        "SELECT id, project_id, run_id, overall_score, content_coverage, competitive_gap, \
                citation_consistency, freshness, created_at \
         FROM optimization_scores \
         WHERE project_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
