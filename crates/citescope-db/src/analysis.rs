//! Read side of a completed run: the rows the optimizer's loader folds into
//! an `AnalysisData` snapshot.

use citescope_core::{CitationRow, KeywordRow, MentionRow, MentionType, Sentiment};
use sqlx::PgPool;
use uuid::Uuid;

use crate::convert::{citation_class_from_columns, position_from_column};
use crate::projects::list_active_keywords;
use crate::DbError;

/// Everything stored for one run, plus the project's active keywords.
#[derive(Debug, Clone, Default)]
pub struct RunRows {
    pub keywords: Vec<KeywordRow>,
    pub citations: Vec<CitationRow>,
    pub mentions: Vec<MentionRow>,
}

#[derive(sqlx::FromRow)]
struct CitationJoinRow {
    keyword_id: Uuid,
    engine: String,
    url: String,
    position: Option<i32>,
    classification: String,
    competitor_id: Option<Uuid>,
    competitor_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct MentionJoinRow {
    keyword_id: Uuid,
    engine: String,
    mention_type: String,
    sentiment: Option<String>,
    context: String,
}

/// Load the keywords, citations and mentions of `run_id`.
///
/// Mentions with an unrecognised type are logged and skipped. An unknown
/// sentiment is read as missing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails, or [`DbError::InvalidColumn`]
/// if a citation carries an unknown classification.
pub async fn load_run_rows(
    pool: &PgPool,
    project_id: Uuid,
    run_id: Uuid,
) -> Result<RunRows, DbError> {
    let keywords = list_active_keywords(pool, project_id).await?;

    let citation_rows = sqlx::query_as::<_, CitationJoinRow>(
        "SELECT r.keyword_id, r.engine, c.url, c.position, c.classification, \
                c.competitor_id, comp.name AS competitor_name \
         FROM citations c \
         JOIN engine_responses r ON r.id = c.response_id \
         LEFT JOIN competitors comp ON comp.id = c.competitor_id \
         WHERE r.run_id = $1 \
         ORDER BY r.keyword_id, r.engine, c.position NULLS LAST, c.url",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    let citations = citation_rows
        .into_iter()
        .map(|row| {
            let classification =
                citation_class_from_columns(&row.classification, row.competitor_id)?;
            Ok(CitationRow {
                keyword_id: row.keyword_id,
                engine: row.engine,
                url: row.url,
                position: position_from_column(row.position),
                competitor_name: classification
                    .competitor_id()
                    .and(row.competitor_name),
                classification,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    let mention_rows = sqlx::query_as::<_, MentionJoinRow>(
        "SELECT r.keyword_id, r.engine, m.mention_type, m.sentiment, m.context \
         FROM brand_mentions m \
         JOIN engine_responses r ON r.id = m.response_id \
         WHERE r.run_id = $1 \
         ORDER BY r.keyword_id, r.engine, m.id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    let mut mentions = Vec::with_capacity(mention_rows.len());
    for row in mention_rows {
        let Some(mention_type) = MentionType::parse(&row.mention_type) else {
            tracing::warn!(
                %run_id,
                mention_type = %row.mention_type,
                "skipping mention with unknown type"
            );
            continue;
        };
        mentions.push(MentionRow {
            keyword_id: row.keyword_id,
            engine: row.engine,
            mention_type,
            sentiment: row.sentiment.as_deref().and_then(Sentiment::parse),
            context: row.context,
        });
    }

    Ok(RunRows {
        keywords,
        citations,
        mentions,
    })
}

/// Keywords that had at least one brand citation in `run_id`, sorted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_cited_keyword_ids(pool: &PgPool, run_id: Uuid) -> Result<Vec<Uuid>, DbError> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT DISTINCT r.keyword_id \
         FROM citations c \
         JOIN engine_responses r ON r.id = c.response_id \
         WHERE r.run_id = $1 AND c.classification = 'brand' \
         ORDER BY r.keyword_id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
