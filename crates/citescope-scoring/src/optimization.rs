//! Overall optimization score for one analysis run.
//!
//! Four sub-scores (0–100) combine into the overall score with fixed
//! weights. Every sub-score depends only on set membership and counts, so
//! reordering keywords never changes the result.

use std::collections::HashSet;

use citescope_core::{AnalysisData, OptimizationScoreData};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::round1;
use crate::visibility::calculate_trend;

// ---------------------------------------------------------------------------
// Weight constants, in percent
// ---------------------------------------------------------------------------

pub const W_CONTENT_COVERAGE: u32 = 35;
pub const W_COMPETITIVE_GAP: u32 = 25;
pub const W_CITATION_CONSISTENCY: u32 = 25;
pub const W_FRESHNESS: u32 = 15;

const _: () = assert!(
    W_CONTENT_COVERAGE + W_COMPETITIVE_GAP + W_CITATION_CONSISTENCY + W_FRESHNESS == 100,
    "optimization weights must sum to exactly 100"
);

/// Change in the overall score between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTrend {
    /// Absolute change in points, one decimal.
    pub change: f64,
    /// Percent change, one decimal.
    pub percent: f64,
}

/// Compute the optimization score for a run. All values are rounded to one
/// decimal place.
#[must_use]
pub fn calculate_optimization_score(data: &AnalysisData) -> OptimizationScoreData {
    let content_coverage = content_coverage(data);
    let competitive_gap = competitive_gap(data);
    let citation_consistency = citation_consistency(data);
    let freshness = freshness(data);

    let overall = (content_coverage * f64::from(W_CONTENT_COVERAGE)
        + competitive_gap * f64::from(W_COMPETITIVE_GAP)
        + citation_consistency * f64::from(W_CITATION_CONSISTENCY)
        + freshness * f64::from(W_FRESHNESS))
        / 100.0;

    OptimizationScoreData {
        overall_score: round1(overall),
        content_coverage: round1(content_coverage),
        competitive_gap: round1(competitive_gap),
        citation_consistency: round1(citation_consistency),
        freshness: round1(freshness),
    }
}

/// Trend of the overall score against the previous snapshot, if there is one.
#[must_use]
pub fn score_trend(
    latest: &OptimizationScoreData,
    previous: Option<&OptimizationScoreData>,
) -> Option<ScoreTrend> {
    let previous = previous?;
    Some(ScoreTrend {
        change: round1(latest.overall_score - previous.overall_score),
        percent: round1(calculate_trend(
            latest.overall_score,
            previous.overall_score,
        )),
    })
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    100.0 * part as f64 / whole as f64
}

fn content_coverage(data: &AnalysisData) -> f64 {
    let total = data.keyword_analyses.len();
    if total == 0 {
        return 0.0;
    }
    let cited = data
        .keyword_analyses
        .iter()
        .filter(|k| k.has_brand_citation)
        .count();
    percent(cited, total)
}

fn competitive_gap(data: &AnalysisData) -> f64 {
    let total = data.keyword_analyses.len();
    if total == 0 {
        return 100.0;
    }
    let competitor_only = data
        .keyword_analyses
        .iter()
        .filter(|k| !k.has_brand_citation && !k.competitor_citations.is_empty())
        .count();
    100.0 - percent(competitor_only, total)
}

fn citation_consistency(data: &AnalysisData) -> f64 {
    let mut ratios: Vec<f64> = data
        .keyword_analyses
        .iter()
        .filter(|k| k.has_brand_citation && !k.engine_breakdown.is_empty())
        .map(|k| percent(k.engines_citing_brand(), k.engine_breakdown.len()))
        .collect();

    if ratios.is_empty() {
        return 0.0;
    }

    // Summation order affects the last bits of a float sum.
    ratios.sort_by(f64::total_cmp);
    #[allow(clippy::cast_precision_loss)]
    let count = ratios.len() as f64;
    ratios.iter().sum::<f64>() / count
}

fn freshness(data: &AnalysisData) -> f64 {
    let Some(previous) = &data.previous_run else {
        return 100.0;
    };

    let previously_cited: HashSet<Uuid> = previous.cited_keyword_ids.iter().copied().collect();
    if previously_cited.is_empty() {
        return 100.0;
    }

    let cited_now: HashSet<Uuid> = data
        .keyword_analyses
        .iter()
        .filter(|k| k.has_brand_citation)
        .map(|k| k.keyword_id)
        .collect();

    let gone_stale = previously_cited.difference(&cited_now).count();
    100.0 - percent(gone_stale, previously_cited.len())
}

#[cfg(test)]
mod tests {
    use citescope_core::{
        AnalysisTotals, CompetitorCitationSummary, EngineBreakdown, KeywordAnalysis,
        PreviousRunSnapshot, ProjectContext,
    };

    use super::*;

    const EPS: f64 = 1e-9;

    fn engine(name: &str, brand: bool) -> EngineBreakdown {
        EngineBreakdown {
            engine: name.to_string(),
            has_brand_citation: brand,
            brand_citation_count: u32::from(brand),
            competitor_citation_count: 0,
        }
    }

    fn keyword(
        id: u128,
        cited: bool,
        competitors: u32,
        engines: Vec<EngineBreakdown>,
    ) -> KeywordAnalysis {
        KeywordAnalysis {
            keyword_id: Uuid::from_u128(id),
            keyword: format!("keyword {id}"),
            has_brand_citation: cited,
            brand_citation_count: u32::from(cited),
            brand_positions: if cited { vec![1] } else { vec![] },
            competitor_citations: (0..competitors)
                .map(|i| CompetitorCitationSummary {
                    competitor_id: Uuid::from_u128(1000 + u128::from(i)),
                    name: format!("rival {i}"),
                    count: 1,
                    sample_urls: vec![],
                })
                .collect(),
            engine_breakdown: engines,
            dominant_mention_type: None,
            dominant_sentiment: None,
            negative_contexts: vec![],
        }
    }

    fn data(keywords: Vec<KeywordAnalysis>, previous: Option<Vec<u128>>) -> AnalysisData {
        AnalysisData {
            project: ProjectContext {
                project_id: Uuid::from_u128(1),
                brand_name: "Soldier Data".to_string(),
                brand_domain: "soldierdata.com".to_string(),
            },
            totals: AnalysisTotals {
                total_keywords: u32::try_from(keywords.len()).unwrap(),
                ..AnalysisTotals::default()
            },
            keyword_analyses: keywords,
            previous_run: previous.map(|ids| PreviousRunSnapshot {
                cited_keyword_ids: ids.into_iter().map(Uuid::from_u128).collect(),
            }),
        }
    }

    fn sample() -> AnalysisData {
        data(
            vec![
                keyword(1, true, 0, vec![engine("chatgpt", true), engine("perplexity", true)]),
                keyword(2, true, 1, vec![engine("chatgpt", true), engine("perplexity", false)]),
                keyword(3, false, 2, vec![engine("chatgpt", false)]),
                keyword(4, false, 0, vec![]),
            ],
            Some(vec![1, 3]),
        )
    }

    #[test]
    fn empty_run_scores() {
        let score = calculate_optimization_score(&data(vec![], None));
        assert!(score.content_coverage.abs() < EPS);
        assert!((score.competitive_gap - 100.0).abs() < EPS);
        assert!(score.citation_consistency.abs() < EPS);
        assert!((score.freshness - 100.0).abs() < EPS);
        // 0×0.35 + 100×0.25 + 0×0.25 + 100×0.15
        assert!((score.overall_score - 40.0).abs() < EPS);
    }

    #[test]
    fn sub_scores_follow_definitions() {
        let score = calculate_optimization_score(&sample());
        assert!((score.content_coverage - 50.0).abs() < EPS);
        assert!((score.competitive_gap - 75.0).abs() < EPS);
        assert!((score.citation_consistency - 75.0).abs() < EPS);
        assert!((score.freshness - 50.0).abs() < EPS);
        // 17.5 + 18.75 + 18.75 + 7.5
        assert!((score.overall_score - 62.5).abs() < EPS);
    }

    #[test]
    fn overall_is_rounded_to_one_decimal() {
        let score = calculate_optimization_score(&data(
            vec![
                keyword(1, true, 0, vec![engine("chatgpt", true)]),
                keyword(2, false, 0, vec![]),
                keyword(3, false, 0, vec![]),
            ],
            None,
        ));
        assert!((score.content_coverage - 33.3).abs() < EPS);
        // 33.33×0.35 + 100×0.25 + 100×0.25 + 100×0.15 = 76.666…
        assert!((score.overall_score - 76.7).abs() < EPS);
    }

    #[test]
    fn order_of_keywords_does_not_matter() {
        let forward = sample();
        let mut reversed = sample();
        reversed.keyword_analyses.reverse();
        assert_eq!(
            calculate_optimization_score(&forward),
            calculate_optimization_score(&reversed)
        );
    }

    #[test]
    fn previous_run_without_citations_is_fully_fresh() {
        let score =
            calculate_optimization_score(&data(vec![keyword(1, false, 0, vec![])], Some(vec![])));
        assert!((score.freshness - 100.0).abs() < EPS);
    }

    #[test]
    fn trend_needs_previous_snapshot() {
        let latest = OptimizationScoreData {
            overall_score: 60.0,
            ..OptimizationScoreData::default()
        };
        let previous = OptimizationScoreData {
            overall_score: 40.0,
            ..OptimizationScoreData::default()
        };
        assert_eq!(score_trend(&latest, None), None);
        let trend = score_trend(&latest, Some(&previous)).unwrap();
        assert!((trend.change - 20.0).abs() < EPS);
        assert!((trend.percent - 50.0).abs() < EPS);
    }
}
