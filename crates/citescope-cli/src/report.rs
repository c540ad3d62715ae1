//! Markdown optimization report.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use citescope_core::{AnalysisData, AppConfig, EngineWeights};
use citescope_scoring::{
    calculate_share_of_voice, calculate_visibility_score_with, score_trend, EngineVisibility,
};
use uuid::Uuid;

use crate::optimize::load_latest_analysis;
use crate::pipeline::load_tuning;

/// Per-engine citation counts for one run.
///
/// An engine counts a keyword only when it returned a response for it.
fn engine_visibility(data: &AnalysisData) -> Vec<EngineVisibility> {
    let mut per_engine: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for keyword in &data.keyword_analyses {
        for engine in &keyword.engine_breakdown {
            let entry = per_engine.entry(engine.engine.as_str()).or_default();
            entry.1 += 1;
            if engine.has_brand_citation {
                entry.0 += 1;
            }
        }
    }
    per_engine
        .into_iter()
        .map(|(engine, (keywords_cited, total_keywords))| EngineVisibility {
            engine: engine.to_string(),
            keywords_cited,
            total_keywords,
        })
        .collect()
}

/// Citation share per competitor name, plus the brand's, highest first.
fn share_of_voice(data: &AnalysisData) -> (f64, Vec<(String, f64)>) {
    let mut counts: HashMap<Uuid, (&str, u32)> = HashMap::new();
    for keyword in &data.keyword_analyses {
        for competitor in &keyword.competitor_citations {
            let entry = counts
                .entry(competitor.competitor_id)
                .or_insert((competitor.name.as_str(), 0));
            entry.1 += competitor.count;
        }
    }

    let mut competitors: Vec<(&str, u32)> = counts.into_values().collect();
    competitors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let raw_counts: Vec<u32> = competitors.iter().map(|(_, c)| *c).collect();
    let shares = calculate_share_of_voice(data.totals.total_brand_citations, &raw_counts);

    let named = competitors
        .iter()
        .zip(shares.competitor_shares)
        .map(|((name, _), share)| ((*name).to_string(), share))
        .collect();
    (shares.brand_share, named)
}

fn visibility_score(data: &AnalysisData, weights: &EngineWeights) -> f64 {
    calculate_visibility_score_with(&engine_visibility(data), weights)
}

/// Escape a value for a markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// Print a markdown report: latest score and trend, visibility, share of
/// voice, active recommendations and content gaps.
///
/// # Errors
///
/// Returns an error if the project is unknown or a database query fails.
#[allow(clippy::too_many_lines)]
pub(crate) async fn run_report(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    project_slug: &str,
    limit: i64,
) -> anyhow::Result<()> {
    let project = citescope_db::get_project_by_slug(pool, project_slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project '{project_slug}' not found"))?;
    let tuning = load_tuning(config)?;

    let scores = citescope_db::latest_scores(pool, project.id, 2).await?;
    let recommendations =
        citescope_db::list_active_recommendations(pool, project.id, limit).await?;
    let gaps = citescope_db::list_content_gaps(pool, project.id, limit).await?;
    let latest = load_latest_analysis(pool, &project).await?;

    let now = Utc::now().format("%Y-%m-%d %H:%M UTC");

    println!("# Optimization Report: {}", project.name);
    println!();
    println!("**Generated**: {now}");
    println!("**Brand**: {} ({})", project.brand_name, project.brand_domain);
    println!("**Plan**: {}", project.tier());
    println!();
    println!("---");
    println!();

    println!("## Score");
    println!();
    if let Some(latest_score) = scores.first() {
        let current = latest_score.to_score_data();
        let previous = scores
            .get(1)
            .map(citescope_db::OptimizationScoreRow::to_score_data);
        let trend = score_trend(&current, previous.as_ref()).map_or_else(
            || "first snapshot".to_string(),
            |t| format!("{:+.1} ({:+.1}%)", t.change, t.percent),
        );
        println!("| Metric | Value |");
        println!("|--------|-------|");
        println!("| Overall | {:.1} |", current.overall_score);
        println!("| Trend | {trend} |");
        println!("| Content coverage | {:.1} |", current.content_coverage);
        println!("| Competitive gap | {:.1} |", current.competitive_gap);
        println!("| Citation consistency | {:.1} |", current.citation_consistency);
        println!("| Freshness | {:.1} |", current.freshness);
    } else {
        println!("No score yet; run `optimize --project {project_slug}` first.");
    }
    println!();

    if let Some((run_id, data)) = &latest {
        println!("## Visibility (run {run_id})");
        println!();
        println!(
            "**Weighted visibility**: {:.1}",
            visibility_score(data, &tuning.engine_weights)
        );
        println!();
        println!("| Engine | Keywords Cited | Keywords Answered |");
        println!("|--------|----------------|-------------------|");
        for engine in engine_visibility(data) {
            println!(
                "| {} | {} | {} |",
                engine.engine, engine.keywords_cited, engine.total_keywords
            );
        }
        println!();

        let (brand_share, competitor_shares) = share_of_voice(data);
        println!("| Share of Voice | % |");
        println!("|----------------|---|");
        println!("| {} | {brand_share:.1} |", cell(&project.brand_name));
        for (name, share) in competitor_shares {
            println!("| {} | {share:.1} |", cell(&name));
        }
        println!();
    }

    println!("## Recommendations ({})", recommendations.len());
    println!();
    if recommendations.is_empty() {
        println!("No active recommendations.");
    } else {
        println!("| Priority | Type | Keyword | Impact | Source | Title |");
        println!("|----------|------|---------|--------|--------|-------|");
        for rec in &recommendations {
            println!(
                "| {} | {} | {} | {} | {} | {} |",
                rec.priority,
                rec.recommendation_type,
                cell(rec.keyword.as_deref().unwrap_or("-")),
                rec.estimated_impact,
                rec.source,
                cell(&rec.title)
            );
        }
    }
    println!();

    println!("## Content Gaps ({})", gaps.len());
    println!();
    if gaps.is_empty() {
        println!("No open content gaps.");
    } else {
        println!("| Keyword | Gap | Severity | Competitor | Engines |");
        println!("|---------|-----|----------|------------|---------|");
        for gap in &gaps {
            println!(
                "| {} | {} | {} | {} | {} |",
                cell(&gap.keyword),
                gap.gap_type,
                gap.severity,
                cell(gap.competitor_name.as_deref().unwrap_or("-")),
                gap.engine_types.join(", ")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use citescope_core::{
        AnalysisTotals, CompetitorCitationSummary, EngineBreakdown, KeywordAnalysis,
        ProjectContext,
    };

    fn breakdown(engine: &str, cited: bool) -> EngineBreakdown {
        EngineBreakdown {
            engine: engine.to_string(),
            has_brand_citation: cited,
            brand_citation_count: u32::from(cited),
            competitor_citation_count: 0,
        }
    }

    fn keyword(
        id: u128,
        engines: Vec<EngineBreakdown>,
        rivals: Vec<(u128, &str, u32)>,
    ) -> KeywordAnalysis {
        let brand_citation_count = engines.iter().map(|e| e.brand_citation_count).sum();
        KeywordAnalysis {
            keyword_id: Uuid::from_u128(id),
            keyword: format!("keyword {id}"),
            has_brand_citation: brand_citation_count > 0,
            brand_citation_count,
            brand_positions: vec![],
            competitor_citations: rivals
                .into_iter()
                .map(|(cid, name, count)| CompetitorCitationSummary {
                    competitor_id: Uuid::from_u128(cid),
                    name: name.to_string(),
                    count,
                    sample_urls: vec![],
                })
                .collect(),
            engine_breakdown: engines,
            dominant_mention_type: None,
            dominant_sentiment: None,
            negative_contexts: vec![],
        }
    }

    fn data(keywords: Vec<KeywordAnalysis>) -> AnalysisData {
        let total_brand_citations = keywords.iter().map(|k| k.brand_citation_count).sum();
        AnalysisData {
            project: ProjectContext {
                project_id: Uuid::from_u128(1),
                brand_name: "Soldier Data".to_string(),
                brand_domain: "soldierdata.com".to_string(),
            },
            totals: AnalysisTotals {
                total_keywords: u32::try_from(keywords.len()).unwrap(),
                total_brand_citations,
                total_competitor_citations: 0,
            },
            keyword_analyses: keywords,
            previous_run: None,
        }
    }

    #[test]
    fn engine_visibility_counts_only_answering_engines() {
        let run = data(vec![
            keyword(
                10,
                vec![breakdown("chatgpt", true), breakdown("gemini", false)],
                vec![],
            ),
            keyword(11, vec![breakdown("chatgpt", false)], vec![]),
        ]);

        let visibility = engine_visibility(&run);
        assert_eq!(visibility.len(), 2);
        assert_eq!(visibility[0].engine, "chatgpt");
        assert_eq!(visibility[0].keywords_cited, 1);
        assert_eq!(visibility[0].total_keywords, 2);
        assert_eq!(visibility[1].engine, "gemini");
        assert_eq!(visibility[1].total_keywords, 1);
    }

    #[test]
    fn visibility_is_full_when_every_engine_cites_every_keyword() {
        let run = data(vec![keyword(
            10,
            vec![breakdown("chatgpt", true), breakdown("perplexity", true)],
            vec![],
        )]);
        let score = visibility_score(&run, &EngineWeights::default());
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn share_of_voice_aggregates_competitors_across_keywords() {
        let run = data(vec![
            keyword(10, vec![breakdown("chatgpt", true)], vec![(7, "Ahrefs", 2)]),
            keyword(
                11,
                vec![breakdown("chatgpt", false)],
                vec![(7, "Ahrefs", 1), (8, "Moz", 1)],
            ),
        ]);

        let (brand, competitors) = share_of_voice(&run);
        assert!((brand - 20.0).abs() < 1e-9);
        assert_eq!(competitors[0].0, "Ahrefs");
        assert!((competitors[0].1 - 60.0).abs() < 1e-9);
        assert_eq!(competitors[1].0, "Moz");
        assert!((competitors[1].1 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn cells_escape_pipes_and_newlines() {
        assert_eq!(cell("a|b\nc"), "a\\|b c");
    }
}
