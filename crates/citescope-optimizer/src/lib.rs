//! Optimization analysis for citescope.
//!
//! Turns the persisted citations and mentions of a completed run into an
//! [`citescope_core::AnalysisData`] read model, then into prioritized
//! recommendations, content gaps and an optimization score. The rule engine
//! is pure and synchronous; the AI analyzer is the only networked part.

pub mod ai;
pub mod error;
pub mod loader;
pub(crate) mod retry;
pub mod rules;

pub use ai::{analyze_with_ai, AiContext, HttpReasoningClient, ReasoningClient};
pub use error::AnalyzerError;
pub use loader::build_analysis_data;
pub use rules::{
    analyze_with_rules, analyze_with_rules_with, merge_results, recommendations_to_expire,
};
