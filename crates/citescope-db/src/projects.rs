//! Database operations for `projects`, `competitors` and `keywords`.

use chrono::{DateTime, Utc};
use citescope_core::{CompetitorDomain, KeywordRow, ProjectConfig, ProjectContext, Tier};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub brand_name: String,
    pub brand_domain: String,
    pub brand_aliases: Vec<String>,
    pub tier: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectRow {
    #[must_use]
    pub fn context(&self) -> ProjectContext {
        ProjectContext {
            project_id: self.id,
            brand_name: self.brand_name.clone(),
            brand_domain: self.brand_domain.clone(),
        }
    }

    /// Unknown tier strings fall back to `free`.
    #[must_use]
    pub fn tier(&self) -> Tier {
        Tier::parse(&self.tier).unwrap_or_default()
    }
}

/// A row from the `competitors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitorRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub domain: String,
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CompetitorRow {
    #[must_use]
    pub fn to_domain(&self) -> CompetitorDomain {
        CompetitorDomain {
            id: self.id,
            name: self.name.clone(),
            domain: self.domain.clone(),
            aliases: self.aliases.clone(),
        }
    }
}

const PROJECT_COLUMNS: &str =
    "id, slug, name, brand_name, brand_domain, brand_aliases, tier, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Look up a project by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_project_by_slug(pool: &PgPool, slug: &str) -> Result<Option<ProjectRow>, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All projects ordered by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_projects(pool: &PgPool) -> Result<Vec<ProjectRow>, DbError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY slug"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Competitors of a project ordered by name, then id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_competitors(pool: &PgPool, project_id: Uuid) -> Result<Vec<CompetitorRow>, DbError> {
    let rows = sqlx::query_as::<_, CompetitorRow>(
        "SELECT id, project_id, name, domain, aliases, created_at \
         FROM competitors \
         WHERE project_id = $1 \
         ORDER BY name, id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Active keywords of a project ordered by keyword text.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_keywords(pool: &PgPool, project_id: Uuid) -> Result<Vec<KeywordRow>, DbError> {
    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT id, keyword \
         FROM keywords \
         WHERE project_id = $1 AND is_active = true \
         ORDER BY keyword, id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(keyword_id, keyword)| KeywordRow {
            keyword_id,
            keyword,
        })
        .collect())
}

/// Upsert projects, their competitors and keywords from config.
///
/// Returns the number of projects processed. All writes run in one
/// transaction. Keywords missing from the config are deactivated rather than
/// deleted so their history survives.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_projects(pool: &PgPool, projects: &[ProjectConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for project in projects {
        let slug = project.slug();

        let project_id: Uuid = sqlx::query_scalar(
            "INSERT INTO projects (id, slug, name, brand_name, brand_domain, brand_aliases, tier) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 brand_name = EXCLUDED.brand_name, \
                 brand_domain = EXCLUDED.brand_domain, \
                 brand_aliases = EXCLUDED.brand_aliases, \
                 tier = EXCLUDED.tier \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&slug)
        .bind(&project.name)
        .bind(&project.brand_name)
        .bind(project.domain.trim().to_lowercase())
        .bind(&project.aliases)
        .bind(project.tier.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for competitor in &project.competitors {
            sqlx::query(
                "INSERT INTO competitors (id, project_id, name, domain, aliases) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (project_id, domain) DO UPDATE SET \
                     name = EXCLUDED.name, \
                     aliases = EXCLUDED.aliases",
            )
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(&competitor.name)
            .bind(competitor.domain.trim().to_lowercase())
            .bind(&competitor.aliases)
            .execute(&mut *tx)
            .await?;
        }

        let keywords: Vec<String> = project
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .collect();

        sqlx::query(
            "UPDATE keywords SET is_active = false \
             WHERE project_id = $1 AND keyword <> ALL($2)",
        )
        .bind(project_id)
        .bind(&keywords)
        .execute(&mut *tx)
        .await?;

        for keyword in &keywords {
            sqlx::query(
                "INSERT INTO keywords (id, project_id, keyword, is_active) \
                 VALUES ($1, $2, $3, true) \
                 ON CONFLICT (project_id, keyword) DO UPDATE SET is_active = true",
            )
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(keyword)
            .execute(&mut *tx)
            .await?;
        }

        tracing::debug!(
            project = %slug,
            competitors = project.competitors.len(),
            keywords = keywords.len(),
            "seeded project"
        );
        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
