//! AI-powered optimization analysis.
//!
//! Keywords where competitors are cited and the brand is not are sent to an
//! external reasoning service in small batches. Replies are parsed
//! leniently and mapped onto the same recommendation shape the rule engine
//! produces. Nothing here fails the run: a missing key, a failed call or an
//! unreadable reply just means fewer recommendations.

pub mod client;
pub mod parse;

use std::time::Duration;

use citescope_core::{
    AnalysisData, AnalysisResult, AppConfig, GeneratedRecommendation, KeywordAnalysis, Priority,
    ProjectContext, RecommendationSource, RecommendationType,
};
use citescope_scoring::calculate_optimization_score;
use futures::future::join_all;
use serde_json::{json, Map};

use crate::error::AnalyzerError;
use crate::rules::{dedup_recommendations, keyword_text_index, sort_recommendations};

pub use client::{HttpReasoningClient, ReasoningClient};
pub use parse::{parse_ai_response, AiRecommendation, AiResponse};

/// Estimated uplift assigned to every AI recommendation.
pub const AI_ESTIMATED_IMPACT: f64 = 30.0;

const DEFAULT_BATCH_SIZE: usize = 5;
const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);
const MAX_PROMPT_URLS: usize = 3;

/// Gates and pacing for one AI analysis.
#[derive(Clone)]
pub struct AiContext {
    /// `None` disables the analyzer.
    pub api_key: Option<String>,
    /// Whether the project's plan includes AI analysis.
    pub tier_allows_ai: bool,
    /// Keywords analyzed concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
}

impl Default for AiContext {
    fn default() -> Self {
        Self {
            api_key: None,
            tier_allows_ai: false,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl std::fmt::Debug for AiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiContext")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("tier_allows_ai", &self.tier_allows_ai)
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .finish()
    }
}

impl AiContext {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, tier_allows_ai: bool) -> Self {
        Self {
            api_key: config.ai_api_key.clone(),
            tier_allows_ai,
            batch_size: config.ai_batch_size,
            batch_delay: Duration::from_millis(config.ai_batch_delay_ms),
        }
    }
}

/// Run the AI analyzer over the run's competitor-only keywords.
///
/// Calls within a batch run concurrently and settle independently: one
/// failing keyword never cancels the others. The returned score is the same
/// one the rule engine reports; content gaps are left to the rule engine.
pub async fn analyze_with_ai<C: ReasoningClient>(
    data: &AnalysisData,
    ctx: &AiContext,
    client: &C,
) -> AnalysisResult {
    let score = calculate_optimization_score(data);
    let empty = || AnalysisResult {
        recommendations: Vec::new(),
        content_gaps: Vec::new(),
        score,
    };

    if ctx.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        tracing::warn!(
            project = %data.project.project_id,
            "no reasoning service API key configured, skipping AI analysis"
        );
        return empty();
    }
    if !ctx.tier_allows_ai {
        tracing::info!(
            project = %data.project.project_id,
            "plan does not include AI analysis, skipping"
        );
        return empty();
    }

    let candidates: Vec<&KeywordAnalysis> = data
        .keyword_analyses
        .iter()
        .filter(|k| !k.has_brand_citation && !k.competitor_citations.is_empty())
        .collect();
    if candidates.is_empty() {
        return empty();
    }

    let mut recommendations = Vec::new();
    let mut failed = 0usize;
    for (index, batch) in candidates.chunks(ctx.batch_size.max(1)).enumerate() {
        if index > 0 && !ctx.batch_delay.is_zero() {
            tokio::time::sleep(ctx.batch_delay).await;
        }

        let outcomes = join_all(
            batch
                .iter()
                .map(|keyword| analyze_keyword(&data.project, keyword, client)),
        )
        .await;

        for (keyword, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Ok(recs) => recommendations.extend(recs),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        keyword = %keyword.keyword,
                        keyword_id = %keyword.keyword_id,
                        error = %e,
                        "AI analysis failed for keyword"
                    );
                }
            }
        }
    }

    let keyword_text = keyword_text_index(data);
    let mut recommendations = dedup_recommendations(recommendations);
    sort_recommendations(&mut recommendations, &keyword_text);

    tracing::info!(
        project = %data.project.project_id,
        candidates = candidates.len(),
        failed,
        recommendations = recommendations.len(),
        "AI analysis complete"
    );

    AnalysisResult {
        recommendations,
        content_gaps: Vec::new(),
        score,
    }
}

async fn analyze_keyword<C: ReasoningClient>(
    project: &ProjectContext,
    keyword: &KeywordAnalysis,
    client: &C,
) -> Result<Vec<GeneratedRecommendation>, AnalyzerError> {
    let prompt = build_prompt(project, keyword);
    let reply = client.complete(&prompt).await?;

    let Some(parsed) = parse_ai_response(&reply) else {
        tracing::warn!(
            keyword = %keyword.keyword,
            "AI reply contained no usable JSON, no recommendations for keyword"
        );
        return Ok(Vec::new());
    };

    Ok(parsed
        .recommendations
        .into_iter()
        .filter_map(|rec| to_recommendation(keyword, rec))
        .collect())
}

/// Prompt describing the competitor citations for one keyword.
#[must_use]
pub fn build_prompt(project: &ProjectContext, keyword: &KeywordAnalysis) -> String {
    let mut prompt = format!(
        "Brand: {} ({})\nKeyword: \"{}\"\n\n\
         AI answer engines cited competitors for this keyword but never cited the brand.\n\
         Competitor citations:\n",
        project.brand_name, project.brand_domain, keyword.keyword
    );
    for competitor in &keyword.competitor_citations {
        let name = if competitor.name.is_empty() {
            "Unnamed competitor"
        } else {
            competitor.name.as_str()
        };
        prompt.push_str(&format!("- {name}: {} citation(s)", competitor.count));
        let urls: Vec<&str> = competitor
            .sample_urls
            .iter()
            .take(MAX_PROMPT_URLS)
            .map(String::as_str)
            .collect();
        if !urls.is_empty() {
            prompt.push_str(&format!(", e.g. {}", urls.join(", ")));
        }
        prompt.push('\n');
    }

    let engines: Vec<&str> = keyword
        .engine_breakdown
        .iter()
        .filter(|e| e.competitor_citation_count > 0)
        .map(|e| e.engine.as_str())
        .collect();
    if !engines.is_empty() {
        prompt.push_str(&format!("Engines citing competitors: {}\n", engines.join(", ")));
    }

    prompt.push_str(
        "\nSuggest up to three concrete content changes that would make the engines cite the \
         brand. Use one of these types: create_content, update_content, add_schema, \
         improve_structure, add_comparison, improve_authority, optimize_citations.",
    );
    prompt
}

fn to_recommendation(
    keyword: &KeywordAnalysis,
    rec: AiRecommendation,
) -> Option<GeneratedRecommendation> {
    let title = rec.title.trim();
    if title.is_empty() {
        return None;
    }

    let raw_type = rec.kind.trim().to_ascii_lowercase();
    let recommendation_type =
        RecommendationType::parse(&raw_type).unwrap_or(RecommendationType::CreateContent);

    let mut metadata = Map::new();
    if recommendation_type.as_str() != raw_type {
        metadata.insert("original_type".to_string(), json!(rec.kind));
    }

    Some(GeneratedRecommendation {
        recommendation_type,
        priority: Priority::High,
        source: RecommendationSource::AiPowered,
        title: title.to_string(),
        description: rec.description.trim().to_string(),
        actionable_steps: rec
            .steps
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        estimated_impact: AI_ESTIMATED_IMPACT,
        keyword_id: Some(keyword.keyword_id),
        competitor_id: None,
        target_url: None,
        metadata,
    })
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod tests;
