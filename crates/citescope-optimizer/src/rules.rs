//! Rule-based optimization analysis.
//!
//! Every rule looks at one [`KeywordAnalysis`] at a time and may emit
//! recommendations and content gaps; all applicable rules fire. The combined
//! output is de-duplicated and sorted so identical input always produces
//! byte-identical output.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use citescope_core::{
    AnalysisData, AnalysisResult, EngineBreakdown, EngineWeights, ExistingRecommendation,
    GapType, GeneratedContentGap, GeneratedRecommendation, KeywordAnalysis, Priority,
    RecommendationSource, RecommendationStatus, RecommendationType, Sentiment,
};
use citescope_scoring::calculate_optimization_score;
use regex::Regex;
use serde_json::{json, Map, Value};
use uuid::Uuid;

static DEFAULT_WEIGHTS: LazyLock<EngineWeights> = LazyLock::new(EngineWeights::default);

static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(how\s+(to|do|does|can|much|many)|what|why|when|where|which|who|can|does|is|are|should)\b",
    )
    .expect("valid question regex")
});

/// Brand rank at which a citation counts as low prominence.
pub const LOW_PROMINENCE_POSITION: u32 = 4;
/// Brand rank at which low prominence escalates to `high`.
pub const HIGH_PRIORITY_POSITION: u32 = 7;
/// Ranks past the threshold over which low-prominence severity reaches 1.0.
const LOW_PROMINENCE_SPAN: f64 = 7.0;

const MAX_QUOTED_CONTEXTS: usize = 3;

/// Estimated uplift, in percentage points, per recommendation type.
#[must_use]
pub fn base_impact(kind: RecommendationType) -> f64 {
    match kind {
        RecommendationType::CreateContent => 25.0,
        RecommendationType::AddComparison => 20.0,
        RecommendationType::UpdateContent => 18.0,
        RecommendationType::ImproveAuthority => 15.0,
        RecommendationType::ImproveStructure => 12.0,
        RecommendationType::AddSchema | RecommendationType::OptimizeCitations => 8.0,
    }
}

/// Run every rule with the built-in engine weights.
#[must_use]
pub fn analyze_with_rules(data: &AnalysisData) -> AnalysisResult {
    analyze_with_rules_with(data, &DEFAULT_WEIGHTS)
}

/// Run every rule over every keyword of the run.
///
/// No randomness and no clock: timestamps are the persister's business.
#[must_use]
pub fn analyze_with_rules_with(data: &AnalysisData, weights: &EngineWeights) -> AnalysisResult {
    let previously_cited: HashSet<Uuid> = data
        .previous_run
        .as_ref()
        .map(|p| p.cited_keyword_ids.iter().copied().collect())
        .unwrap_or_default();

    let ctx = RuleContext {
        brand_name: &data.project.brand_name,
        weights,
        previously_cited,
    };

    let mut findings = Findings::default();
    for keyword in &data.keyword_analyses {
        for rule in RULES {
            rule(keyword, &ctx, &mut findings);
        }
    }

    let keyword_text = keyword_text_index(data);
    let mut recommendations = dedup_recommendations(findings.recommendations);
    sort_recommendations(&mut recommendations, &keyword_text);
    let mut content_gaps = findings.gaps;
    sort_gaps(&mut content_gaps, &keyword_text);

    tracing::debug!(
        project = %data.project.project_id,
        keywords = data.keyword_analyses.len(),
        recommendations = recommendations.len(),
        gaps = content_gaps.len(),
        "rule analysis complete"
    );

    AnalysisResult {
        recommendations,
        content_gaps,
        score: calculate_optimization_score(data),
    }
}

/// Ids of active recommendations made moot by a brand citation in this run.
///
/// Only `create_content` and `add_schema` expire this way; the rest stay
/// until the user acts on them. Returned ids are sorted.
#[must_use]
pub fn recommendations_to_expire(
    existing: &[ExistingRecommendation],
    data: &AnalysisData,
) -> Vec<Uuid> {
    let cited: HashSet<Uuid> = data
        .keyword_analyses
        .iter()
        .filter(|k| k.has_brand_citation)
        .map(|k| k.keyword_id)
        .collect();

    let mut ids: Vec<Uuid> = existing
        .iter()
        .filter(|r| r.status == RecommendationStatus::Active)
        .filter(|r| r.recommendation_type.expires_on_citation())
        .filter(|r| r.keyword_id.is_some_and(|id| cited.contains(&id)))
        .map(|r| r.id)
        .collect();
    ids.sort_unstable();
    ids
}

/// Fold AI recommendations into a rule-engine result.
///
/// Rule findings come first, so on an equal-priority collision the rule
/// recommendation is kept. Gaps and score come from `rules` unchanged.
#[must_use]
pub fn merge_results(
    data: &AnalysisData,
    rules: AnalysisResult,
    ai: AnalysisResult,
) -> AnalysisResult {
    let mut combined = rules.recommendations;
    combined.extend(ai.recommendations);

    let keyword_text = keyword_text_index(data);
    let mut recommendations = dedup_recommendations(combined);
    sort_recommendations(&mut recommendations, &keyword_text);

    AnalysisResult {
        recommendations,
        content_gaps: rules.content_gaps,
        score: rules.score,
    }
}

// ---------------------------------------------------------------------------
// Rule plumbing
// ---------------------------------------------------------------------------

struct RuleContext<'a> {
    brand_name: &'a str,
    weights: &'a EngineWeights,
    previously_cited: HashSet<Uuid>,
}

#[derive(Default)]
struct Findings {
    recommendations: Vec<GeneratedRecommendation>,
    gaps: Vec<GeneratedContentGap>,
}

type RuleFn = fn(&KeywordAnalysis, &RuleContext<'_>, &mut Findings);

const RULES: &[RuleFn] = &[
    no_brand_citation,
    competitor_only,
    stale_content,
    low_prominence,
    single_engine_citation,
    negative_sentiment,
    missing_schema,
];

fn recommendation(
    kind: RecommendationType,
    priority: Priority,
    keyword: &KeywordAnalysis,
    title: String,
    description: String,
    actionable_steps: Vec<String>,
) -> GeneratedRecommendation {
    GeneratedRecommendation {
        recommendation_type: kind,
        priority,
        source: RecommendationSource::RuleBased,
        title,
        description,
        actionable_steps,
        estimated_impact: base_impact(kind),
        keyword_id: Some(keyword.keyword_id),
        competitor_id: None,
        target_url: None,
        metadata: Map::new(),
    }
}

fn gap(
    keyword: &KeywordAnalysis,
    gap_type: GapType,
    severity: f64,
    engine_types: Vec<String>,
) -> GeneratedContentGap {
    GeneratedContentGap {
        keyword_id: keyword.keyword_id,
        gap_type,
        severity: severity.clamp(0.0, 1.0),
        competitor_id: None,
        competitor_url: None,
        engine_types,
    }
}

fn engines_where(
    keyword: &KeywordAnalysis,
    pred: impl Fn(&EngineBreakdown) -> bool,
) -> Vec<String> {
    let mut engines: Vec<String> = keyword
        .engine_breakdown
        .iter()
        .filter(|e| pred(e))
        .map(|e| e.engine.clone())
        .collect();
    engines.sort();
    engines
}

fn competitor_label(name: &str) -> &str {
    if name.is_empty() {
        "a competitor"
    } else {
        name
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn no_brand_citation(k: &KeywordAnalysis, ctx: &RuleContext<'_>, out: &mut Findings) {
    if k.has_brand_citation {
        return;
    }

    let primary_engine_cites_competitor = k
        .engine_breakdown
        .iter()
        .any(|e| e.competitor_citation_count > 0 && ctx.weights.is_primary(&e.engine));
    let has_competitors = !k.competitor_citations.is_empty();
    let priority = if primary_engine_cites_competitor {
        Priority::Critical
    } else if has_competitors {
        Priority::High
    } else {
        Priority::Medium
    };

    let mut description = format!(
        "No answer engine cited {} for \"{}\" in this run.",
        ctx.brand_name, k.keyword
    );
    if has_competitors {
        let names: Vec<&str> = k
            .competitor_citations
            .iter()
            .map(|c| competitor_label(&c.name))
            .collect();
        description.push_str(&format!(" Cited instead: {}.", names.join(", ")));
    }

    let engines = engines_where(k, |_| true);
    let mut rec = recommendation(
        RecommendationType::CreateContent,
        priority,
        k,
        format!("Create content targeting \"{}\"", k.keyword),
        description,
        vec![
            format!("Publish a page that answers \"{}\" directly", k.keyword),
            "Open with a short, quotable answer before the details".to_string(),
            "Link the new page from related pages on the site".to_string(),
        ],
    );
    rec.metadata.insert("engines".to_string(), json!(engines));
    rec.metadata.insert(
        "competitor_count".to_string(),
        json!(k.competitor_citations.len()),
    );
    out.recommendations.push(rec);

    let severity = if has_competitors { 1.0 } else { 0.8 };
    out.gaps
        .push(gap(k, GapType::NoBrandCitation, severity, engines));
}

fn competitor_only(k: &KeywordAnalysis, ctx: &RuleContext<'_>, out: &mut Findings) {
    if k.has_brand_citation || k.competitor_citations.is_empty() {
        return;
    }

    let engines = engines_where(k, |e| e.competitor_citation_count > 0);
    for competitor in &k.competitor_citations {
        let name = competitor_label(&competitor.name);
        let target_url = competitor.sample_urls.first().cloned();

        let mut rec = recommendation(
            RecommendationType::AddComparison,
            Priority::High,
            k,
            format!("Compare {} with {name} for \"{}\"", ctx.brand_name, k.keyword),
            format!(
                "{name} was cited {} time(s) for \"{}\" while {} was not.",
                competitor.count, k.keyword, ctx.brand_name
            ),
            vec![
                format!("Review the cited {name} pages and note what they cover"),
                format!("Publish an honest {} vs {name} comparison", ctx.brand_name),
                "Back claims with data and first-hand examples".to_string(),
            ],
        );
        rec.competitor_id = Some(competitor.competitor_id);
        rec.target_url.clone_from(&target_url);
        rec.metadata
            .insert("citation_count".to_string(), json!(competitor.count));
        rec.metadata
            .insert("sample_urls".to_string(), json!(competitor.sample_urls));
        out.recommendations.push(rec);

        let severity = (0.5 + 0.1 * f64::from(competitor.count)).min(1.0);
        let mut g = gap(k, GapType::CompetitorOnly, severity, engines.clone());
        g.competitor_id = Some(competitor.competitor_id);
        g.competitor_url = target_url;
        out.gaps.push(g);
    }
}

fn stale_content(k: &KeywordAnalysis, ctx: &RuleContext<'_>, out: &mut Findings) {
    if k.has_brand_citation || !ctx.previously_cited.contains(&k.keyword_id) {
        return;
    }

    out.recommendations.push(recommendation(
        RecommendationType::UpdateContent,
        Priority::High,
        k,
        format!("Refresh content for \"{}\"", k.keyword),
        format!(
            "{} was cited for \"{}\" in the previous run but not in this one.",
            ctx.brand_name, k.keyword
        ),
        vec![
            "Update statistics, dates and examples on the ranking page".to_string(),
            "Add sections covering what currently cited sources discuss".to_string(),
            "Re-submit the page for indexing after the update".to_string(),
        ],
    ));
    out.gaps.push(gap(
        k,
        GapType::StaleContent,
        0.8,
        engines_where(k, |_| true),
    ));
}

fn low_prominence(k: &KeywordAnalysis, _ctx: &RuleContext<'_>, out: &mut Findings) {
    let Some(position) = k.best_brand_position() else {
        return;
    };
    if position < LOW_PROMINENCE_POSITION {
        return;
    }

    let priority = if position >= HIGH_PRIORITY_POSITION {
        Priority::High
    } else {
        Priority::Medium
    };

    let mut rec = recommendation(
        RecommendationType::ImproveStructure,
        priority,
        k,
        format!("Improve citation prominence for \"{}\"", k.keyword),
        format!(
            "The best brand citation for \"{}\" sits at position {position}.",
            k.keyword
        ),
        vec![
            "Move the direct answer to the top of the page".to_string(),
            "Use descriptive headings and short, scannable sections".to_string(),
            "Add a summary table or list engines can lift verbatim".to_string(),
        ],
    );
    rec.metadata
        .insert("best_position".to_string(), json!(position));
    out.recommendations.push(rec);

    let severity = f64::from(position - (LOW_PROMINENCE_POSITION - 1)) / LOW_PROMINENCE_SPAN;
    out.gaps.push(gap(
        k,
        GapType::LowProminence,
        severity,
        engines_where(k, |e| e.has_brand_citation),
    ));
}

fn single_engine_citation(k: &KeywordAnalysis, _ctx: &RuleContext<'_>, out: &mut Findings) {
    if k.engines_citing_brand() != 1 || k.engine_breakdown.len() < 2 {
        return;
    }

    let cited_on = engines_where(k, |e| e.has_brand_citation);
    let missing = engines_where(k, |e| !e.has_brand_citation);

    let mut rec = recommendation(
        RecommendationType::OptimizeCitations,
        Priority::Medium,
        k,
        format!("Broaden engine coverage for \"{}\"", k.keyword),
        format!(
            "Only {} cites the brand for \"{}\"; {} do not.",
            cited_on.join(", "),
            k.keyword,
            missing.join(", ")
        ),
        vec![
            "Check the page is crawlable by every engine's crawler".to_string(),
            "Earn mentions on sources the other engines already cite".to_string(),
        ],
    );
    rec.metadata.insert("cited_engines".to_string(), json!(cited_on));
    rec.metadata.insert("missing_engines".to_string(), json!(missing));
    out.recommendations.push(rec);
}

fn negative_sentiment(k: &KeywordAnalysis, ctx: &RuleContext<'_>, out: &mut Findings) {
    if k.negative_contexts.is_empty() && k.dominant_sentiment != Some(Sentiment::Negative) {
        return;
    }

    let quoted: Vec<&String> = k.negative_contexts.iter().take(MAX_QUOTED_CONTEXTS).collect();
    let mut description = format!(
        "Answer engines describe {} negatively for \"{}\".",
        ctx.brand_name, k.keyword
    );
    if let Some(first) = quoted.first() {
        description.push_str(&format!(" For example: \"{}\"", first.trim()));
    }

    let mut rec = recommendation(
        RecommendationType::ImproveAuthority,
        Priority::Medium,
        k,
        format!("Address negative framing for \"{}\"", k.keyword),
        description,
        vec![
            "Publish content that answers the concerns raised".to_string(),
            "Collect reviews and case studies that counter the claim".to_string(),
            "Correct outdated information on third-party listings".to_string(),
        ],
    );
    rec.metadata.insert(
        "contexts".to_string(),
        Value::Array(quoted.into_iter().map(|c| json!(c)).collect()),
    );
    out.recommendations.push(rec);
}

fn missing_schema(k: &KeywordAnalysis, _ctx: &RuleContext<'_>, out: &mut Findings) {
    if !is_question(&k.keyword) {
        return;
    }
    let already_queued = out.recommendations.iter().any(|r| {
        r.keyword_id == Some(k.keyword_id)
            && r.recommendation_type == RecommendationType::AddSchema
    });
    if already_queued {
        return;
    }

    out.recommendations.push(recommendation(
        RecommendationType::AddSchema,
        Priority::Low,
        k,
        format!("Add FAQ schema for \"{}\"", k.keyword),
        format!(
            "\"{}\" reads as a question; structured FAQ markup helps engines extract the answer.",
            k.keyword
        ),
        vec![
            "Add FAQPage or HowTo JSON-LD to the answering page".to_string(),
            "Keep each marked-up answer short and self-contained".to_string(),
        ],
    ));
}

fn is_question(keyword: &str) -> bool {
    keyword.trim_end().ends_with('?') || QUESTION_RE.is_match(keyword)
}

// ---------------------------------------------------------------------------
// Dedup and ordering
// ---------------------------------------------------------------------------

pub(crate) fn keyword_text_index(data: &AnalysisData) -> HashMap<Uuid, &str> {
    data.keyword_analyses
        .iter()
        .map(|k| (k.keyword_id, k.keyword.as_str()))
        .collect()
}

/// Collapse recommendations sharing `(keyword_id, type, competitor_id)`,
/// keeping the highest priority. Ties keep the one generated first.
pub(crate) fn dedup_recommendations(
    recommendations: Vec<GeneratedRecommendation>,
) -> Vec<GeneratedRecommendation> {
    let mut index: HashMap<_, usize> = HashMap::new();
    let mut kept: Vec<GeneratedRecommendation> = Vec::with_capacity(recommendations.len());

    for rec in recommendations {
        match index.get(&rec.dedup_key()) {
            Some(&i) => {
                if rec.priority.rank() > kept[i].priority.rank() {
                    kept[i] = rec;
                }
            }
            None => {
                index.insert(rec.dedup_key(), kept.len());
                kept.push(rec);
            }
        }
    }
    kept
}

/// Priority first, then keyword text, type and competitor.
pub(crate) fn sort_recommendations(
    recommendations: &mut [GeneratedRecommendation],
    keyword_text: &HashMap<Uuid, &str>,
) {
    let text = |id: Option<Uuid>| -> &str {
        id.and_then(|id| keyword_text.get(&id).copied())
            .unwrap_or_default()
    };
    recommendations.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then_with(|| text(a.keyword_id).cmp(text(b.keyword_id)))
            .then_with(|| {
                a.recommendation_type
                    .as_str()
                    .cmp(b.recommendation_type.as_str())
            })
            .then_with(|| a.competitor_id.cmp(&b.competitor_id))
            .then_with(|| a.keyword_id.cmp(&b.keyword_id))
    });
}

fn sort_gaps(gaps: &mut [GeneratedContentGap], keyword_text: &HashMap<Uuid, &str>) {
    let text = |id: Uuid| -> &str { keyword_text.get(&id).copied().unwrap_or_default() };
    gaps.sort_by(|a, b| {
        text(a.keyword_id)
            .cmp(text(b.keyword_id))
            .then_with(|| a.gap_type.cmp(&b.gap_type))
            .then_with(|| a.competitor_id.cmp(&b.competitor_id))
            .then_with(|| a.keyword_id.cmp(&b.keyword_id))
    });
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
