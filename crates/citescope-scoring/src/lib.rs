//! Pure scoring functions over already-aggregated citation counts.
//!
//! Nothing here performs I/O or reads the clock; identical input always
//! yields identical output.

pub mod optimization;
pub mod visibility;

pub use optimization::{calculate_optimization_score, score_trend, ScoreTrend};
pub use visibility::{
    calculate_citation_confidence, calculate_prominence_score, calculate_share_of_voice,
    calculate_trend, calculate_visibility_score, calculate_visibility_score_with,
    EngineVisibility, ShareOfVoice,
};

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
