//! Database operations for `content_gaps`.

use chrono::{DateTime, Utc};
use citescope_core::GeneratedContentGap;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::convert::to_decimal;
use crate::DbError;

/// A row from the `content_gaps` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentGapRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub keyword_id: Uuid,
    pub keyword: String,
    pub gap_type: String,
    pub severity: Decimal,
    pub competitor_id: Option<Uuid>,
    pub competitor_name: Option<String>,
    pub competitor_url: Option<String>,
    pub engine_types: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert or refresh one gap keyed on `(project, keyword, gap_type, competitor)`.
///
/// A refresh keeps the original `detected_at`. The unique constraint cannot
/// match rows whose competitor is NULL, so those are looked up explicitly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_content_gap(
    conn: &mut PgConnection,
    project_id: Uuid,
    gap: &GeneratedContentGap,
) -> Result<Uuid, DbError> {
    let severity = to_decimal(gap.severity.clamp(0.0, 1.0), 3);

    if let Some(competitor_id) = gap.competitor_id {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO content_gaps \
                 (id, project_id, keyword_id, gap_type, severity, competitor_id, \
                  competitor_url, engine_types) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (project_id, keyword_id, gap_type, competitor_id) DO UPDATE SET \
                 severity = EXCLUDED.severity, \
                 competitor_url = EXCLUDED.competitor_url, \
                 engine_types = EXCLUDED.engine_types, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(gap.keyword_id)
        .bind(gap.gap_type.as_str())
        .bind(severity)
        .bind(competitor_id)
        .bind(gap.competitor_url.as_deref())
        .bind(&gap.engine_types)
        .fetch_one(&mut *conn)
        .await?;
        return Ok(id);
    }

    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM content_gaps \
         WHERE project_id = $1 AND keyword_id = $2 AND gap_type = $3 \
           AND competitor_id IS NULL \
         LIMIT 1",
    )
    .bind(project_id)
    .bind(gap.keyword_id)
    .bind(gap.gap_type.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        sqlx::query(
            "UPDATE content_gaps \
             SET severity = $2, competitor_url = $3, engine_types = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(severity)
        .bind(gap.competitor_url.as_deref())
        .bind(&gap.engine_types)
        .execute(&mut *conn)
        .await?;
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO content_gaps \
             (id, project_id, keyword_id, gap_type, severity, competitor_id, \
              competitor_url, engine_types) \
         VALUES ($1, $2, $3, $4, $5, NULL, $6, $7)",
    )
    .bind(id)
    .bind(project_id)
    .bind(gap.keyword_id)
    .bind(gap.gap_type.as_str())
    .bind(severity)
    .bind(gap.competitor_url.as_deref())
    .bind(&gap.engine_types)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// Outcome of [`sync_content_gaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapSync {
    pub upserted: usize,
    /// Stored gaps absent from the new batch, now deleted.
    pub resolved: u64,
}

/// Make the project's stored gaps match `gaps` in one transaction.
///
/// Every gap in the batch is upserted; any other gap of the project is a
/// gap that no longer applies and is deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the batch is rolled back.
pub async fn sync_content_gaps(
    pool: &PgPool,
    project_id: Uuid,
    gaps: &[GeneratedContentGap],
) -> Result<GapSync, DbError> {
    let mut tx = pool.begin().await?;
    let mut kept = Vec::with_capacity(gaps.len());
    for gap in gaps {
        kept.push(upsert_content_gap(&mut *tx, project_id, gap).await?);
    }

    let resolved = sqlx::query("DELETE FROM content_gaps WHERE project_id = $1 AND id <> ALL($2)")
        .bind(project_id)
        .bind(&kept)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(GapSync {
        upserted: gaps.len(),
        resolved,
    })
}

/// Gaps of a project, most severe first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_gaps(
    pool: &PgPool,
    project_id: Uuid,
    limit: i64,
) -> Result<Vec<ContentGapRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentGapRow>(
        "SELECT g.id, g.project_id, g.keyword_id, k.keyword, g.gap_type, g.severity, \
                g.competitor_id, c.name AS competitor_name, g.competitor_url, \
                g.engine_types, g.detected_at, g.updated_at \
         FROM content_gaps g \
         JOIN keywords k ON k.id = g.keyword_id \
         LEFT JOIN competitors c ON c.id = g.competitor_id \
         WHERE g.project_id = $1 \
         ORDER BY g.severity DESC, k.keyword, g.gap_type \
         LIMIT $2",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
