//! Database operations for `recommendations`.

use chrono::{DateTime, Utc};
use citescope_core::{
    ExistingRecommendation, GeneratedRecommendation, RecommendationStatus, RecommendationType,
};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::convert::to_decimal;
use crate::DbError;

/// A row from the `recommendations` table, with the keyword text joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecommendationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub run_id: Uuid,
    pub keyword_id: Option<Uuid>,
    pub keyword: Option<String>,
    pub competitor_id: Option<Uuid>,
    pub recommendation_type: String,
    pub priority: String,
    pub source: String,
    pub title: String,
    pub description: String,
    pub actionable_steps: Value,
    pub estimated_impact: Decimal,
    pub target_url: Option<String>,
    pub metadata: Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecommendationRow {
    /// Steps stored as a JSON array of strings; anything else yields none.
    #[must_use]
    pub fn steps(&self) -> Vec<String> {
        self.actionable_steps
            .as_array()
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Replace the recommendations generated for `run_id` with `recommendations`.
///
/// Re-running the optimizer on the same run therefore never duplicates rows.
/// Returns the number inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the previous set is kept.
pub async fn replace_run_recommendations(
    pool: &PgPool,
    project_id: Uuid,
    run_id: Uuid,
    recommendations: &[GeneratedRecommendation],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM recommendations WHERE project_id = $1 AND run_id = $2")
        .bind(project_id)
        .bind(run_id)
        .execute(&mut *tx)
        .await?;

    for rec in recommendations {
        sqlx::query(
            "INSERT INTO recommendations \
                 (id, project_id, run_id, keyword_id, competitor_id, recommendation_type, \
                  priority, source, title, description, actionable_steps, estimated_impact, \
                  target_url, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(run_id)
        .bind(rec.keyword_id)
        .bind(rec.competitor_id)
        .bind(rec.recommendation_type.as_str())
        .bind(rec.priority.as_str())
        .bind(rec.source.as_str())
        .bind(&rec.title)
        .bind(&rec.description)
        .bind(Value::from(rec.actionable_steps.clone()))
        .bind(to_decimal(rec.estimated_impact, 1))
        .bind(rec.target_url.as_deref())
        .bind(Value::Object(rec.metadata.clone()))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(recommendations.len())
}

/// Active recommendations of a project in the shape the expiry rule expects.
///
/// Rows whose type or status is not recognised are skipped with a warning.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_expirable_recommendations(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ExistingRecommendation>, DbError> {
    let rows: Vec<(Uuid, Option<Uuid>, String, String)> = sqlx::query_as(
        "SELECT id, keyword_id, recommendation_type, status \
         FROM recommendations \
         WHERE project_id = $1 AND status = 'active' \
         ORDER BY id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    let mut existing = Vec::with_capacity(rows.len());
    for (id, keyword_id, kind, status) in rows {
        let (Some(recommendation_type), Some(status)) = (
            RecommendationType::parse(&kind),
            RecommendationStatus::parse(&status),
        ) else {
            tracing::warn!(%id, recommendation_type = %kind, "skipping unrecognised recommendation");
            continue;
        };
        existing.push(ExistingRecommendation {
            id,
            keyword_id,
            recommendation_type,
            status,
        });
    }

    Ok(existing)
}

/// Mark the given recommendations `expired`. Only active rows change.
///
/// Returns the number of rows updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn expire_recommendations(pool: &PgPool, ids: &[Uuid]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE recommendations \
         SET status = 'expired', updated_at = NOW() \
         WHERE id = ANY($1) AND status = 'active'",
    )
    .bind(ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Active recommendations of a project, most urgent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_recommendations(
    pool: &PgPool,
    project_id: Uuid,
    limit: i64,
) -> Result<Vec<RecommendationRow>, DbError> {
    let rows = sqlx::query_as::<_, RecommendationRow>(
        "SELECT r.id, r.project_id, r.run_id, r.keyword_id, k.keyword, r.competitor_id, \
                r.recommendation_type, r.priority, r.source, r.title, r.description, \
                r.actionable_steps, r.estimated_impact, r.target_url, r.metadata, \
                r.status, r.created_at, r.updated_at \
         FROM recommendations r \
         LEFT JOIN keywords k ON k.id = r.keyword_id \
         WHERE r.project_id = $1 AND r.status = 'active' \
         ORDER BY CASE r.priority \
                      WHEN 'critical' THEN 4 \
                      WHEN 'high' THEN 3 \
                      WHEN 'medium' THEN 2 \
                      ELSE 1 \
                  END DESC, \
                  r.estimated_impact DESC, \
                  r.created_at DESC, \
                  r.id \
         LIMIT $2",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_with_steps(steps: Value) -> RecommendationRow {
        RecommendationRow {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            run_id: Uuid::nil(),
            keyword_id: None,
            keyword: None,
            competitor_id: None,
            recommendation_type: "create_content".to_string(),
            priority: "high".to_string(),
            source: "rule_based".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            actionable_steps: steps,
            estimated_impact: Decimal::new(250, 1),
            target_url: None,
            metadata: json!({}),
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn steps_reads_string_array() {
        let row = row_with_steps(json!(["Write a guide", "Add FAQ schema"]));
        assert_eq!(row.steps(), vec!["Write a guide", "Add FAQ schema"]);
    }

    #[test]
    fn steps_ignores_non_array_and_non_string_values() {
        assert!(row_with_steps(json!({"a": 1})).steps().is_empty());
        assert_eq!(row_with_steps(json!(["ok", 3, null])).steps(), vec!["ok"]);
    }
}
