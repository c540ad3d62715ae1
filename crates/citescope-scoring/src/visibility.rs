//! Visibility, confidence, prominence, share-of-voice and trend scores.

use std::sync::LazyLock;

use citescope_core::EngineWeights;
use serde::{Deserialize, Serialize};

static DEFAULT_WEIGHTS: LazyLock<EngineWeights> = LazyLock::new(EngineWeights::default);

/// Runs needed before citation confidence stops being damped.
pub const CONFIDENCE_FULL_SAMPLE: u32 = 5;

/// Prominence lost per rank below the top position.
pub const PROMINENCE_STEP: f64 = 0.1;

/// Per-engine citation counts for one project run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVisibility {
    pub engine: String,
    pub keywords_cited: u32,
    pub total_keywords: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareOfVoice {
    /// Brand share in percent.
    pub brand_share: f64,
    /// One share per competitor count, in input order.
    pub competitor_shares: Vec<f64>,
}

/// Weighted visibility score (0–100) using the built-in engine weights.
#[must_use]
pub fn calculate_visibility_score(per_engine: &[EngineVisibility]) -> f64 {
    calculate_visibility_score_with(per_engine, &DEFAULT_WEIGHTS)
}

/// Weighted average of per-engine citation rates.
///
/// Each engine scores `100 × cited / total`. Engines with no keywords are
/// left out of the average entirely rather than counted as zero. Returns
/// `0.0` when no engine qualifies.
#[must_use]
pub fn calculate_visibility_score_with(
    per_engine: &[EngineVisibility],
    weights: &EngineWeights,
) -> f64 {
    let (weighted, total_weight) = per_engine
        .iter()
        .filter(|e| e.total_keywords > 0)
        .fold((0.0, 0.0), |(weighted, total_weight), e| {
            let rate = (f64::from(e.keywords_cited) / f64::from(e.total_keywords)).min(1.0);
            let weight = weights.weight_for(&e.engine);
            (weighted + 100.0 * rate * weight, total_weight + weight)
        });

    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    }
}

/// Confidence in `[0, 1]` that a citation rate is real.
///
/// The citation ratio is damped by `min(1, total_runs / 5)`, so one hit out
/// of one run scores lower than eight out of ten.
#[must_use]
pub fn calculate_citation_confidence(cited_runs: u32, total_runs: u32) -> f64 {
    if total_runs == 0 {
        return 0.0;
    }
    let ratio = (f64::from(cited_runs) / f64::from(total_runs)).clamp(0.0, 1.0);
    let damping = (f64::from(total_runs) / f64::from(CONFIDENCE_FULL_SAMPLE)).min(1.0);
    ratio * damping
}

/// `1.0` at rank 1, minus `0.1` per rank below it, floored at `0.0`.
/// Rank 0 (unranked) scores `0.0`.
#[must_use]
pub fn calculate_prominence_score(position: u32) -> f64 {
    if position == 0 {
        return 0.0;
    }
    (1.0 - PROMINENCE_STEP * f64::from(position - 1)).max(0.0)
}

#[must_use]
pub fn calculate_share_of_voice(brand_count: u32, competitor_counts: &[u32]) -> ShareOfVoice {
    let total: u64 =
        u64::from(brand_count) + competitor_counts.iter().copied().map(u64::from).sum::<u64>();

    if total == 0 {
        return ShareOfVoice {
            brand_share: 0.0,
            competitor_shares: vec![0.0; competitor_counts.len()],
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let share = |count: u32| 100.0 * f64::from(count) / total as f64;

    ShareOfVoice {
        brand_share: share(brand_count),
        competitor_shares: competitor_counts.iter().copied().map(share).collect(),
    }
}

/// Percent change from `previous` to `current`.
///
/// Growth from nothing is a full `+100`; no change from nothing is `0`.
#[must_use]
pub fn calculate_trend(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 {
            100.0
        } else if current < 0.0 {
            -100.0
        } else {
            0.0
        };
    }
    (current - previous) / previous.abs() * 100.0
}
