//! Heuristic tuning parameters: mention-detector thresholds, the sentiment
//! cue lexicon, and per-engine importance weights.
//!
//! Defaults are compiled in. A YAML file can override any section; omitted
//! sections and fields keep their defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Engines at or above this weight are treated as primary answer engines.
pub const PRIMARY_ENGINE_MIN_WEIGHT: f64 = 1.2;

const DEFAULT_POSITIVE_CUES: &[&str] = &[
    "best",
    "recommended",
    "recommend",
    "excellent",
    "top choice",
    "leading",
    "reliable",
    "trusted",
    "popular",
    "great",
    "powerful",
    "easy to use",
    "favorite",
    "standout",
];

const DEFAULT_NEGATIVE_CUES: &[&str] = &[
    "expensive",
    "complicated",
    "poor",
    "worse than",
    "outdated",
    "limited",
    "unreliable",
    "buggy",
    "difficult",
    "slow",
    "overpriced",
    "lacks",
    "avoid",
    "confusing",
];

const DEFAULT_ENGINE_WEIGHTS: &[(&str, f64)] = &[
    ("chatgpt", 1.2),
    ("google_ai_overview", 1.2),
    ("perplexity", 1.0),
    ("gemini", 1.0),
    ("claude", 0.9),
    ("copilot", 0.8),
];

/// Mention-detector tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Characters captured on each side of a match.
    pub context_window: usize,
    /// Largest Levenshtein distance still counted as an indirect mention.
    pub fuzzy_max_distance: usize,
    /// Brand tokens shorter than this are never fuzzy-matched.
    pub fuzzy_min_length: usize,
    pub positive_cues: Vec<String>,
    pub negative_cues: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            context_window: 100,
            fuzzy_max_distance: 2,
            fuzzy_min_length: 5,
            positive_cues: DEFAULT_POSITIVE_CUES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            negative_cues: DEFAULT_NEGATIVE_CUES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Importance weight per answer engine. Unknown engines weigh `1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineWeights(pub BTreeMap<String, f64>);

impl Default for EngineWeights {
    fn default() -> Self {
        Self(
            DEFAULT_ENGINE_WEIGHTS
                .iter()
                .map(|(engine, weight)| ((*engine).to_string(), *weight))
                .collect(),
        )
    }
}

impl EngineWeights {
    #[must_use]
    pub fn weight_for(&self, engine: &str) -> f64 {
        self.0
            .get(&engine.to_lowercase())
            .copied()
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn is_primary(&self, engine: &str) -> bool {
        self.weight_for(engine) >= PRIMARY_ENGINE_MIN_WEIGHT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub detector: DetectorConfig,
    pub engine_weights: EngineWeights,
}

/// Load and validate tuning from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tuning(path: &Path) -> Result<Tuning, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TuningFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_tuning(&content)
}

/// Parse and validate tuning from a YAML string.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_tuning(content: &str) -> Result<Tuning, ConfigError> {
    let mut tuning: Tuning = serde_yaml::from_str(content).map_err(ConfigError::TuningFileParse)?;
    tuning.engine_weights = EngineWeights(
        tuning
            .engine_weights
            .0
            .into_iter()
            .map(|(engine, weight)| (engine.to_lowercase(), weight))
            .collect(),
    );
    validate_tuning(&tuning)?;
    Ok(tuning)
}

fn validate_tuning(tuning: &Tuning) -> Result<(), ConfigError> {
    let detector = &tuning.detector;

    if detector.context_window == 0 || detector.context_window > 1000 {
        return Err(ConfigError::Validation(format!(
            "context_window must be between 1 and 1000, got {}",
            detector.context_window
        )));
    }

    if detector.fuzzy_min_length < 3 {
        return Err(ConfigError::Validation(format!(
            "fuzzy_min_length must be at least 3, got {}",
            detector.fuzzy_min_length
        )));
    }

    if detector.fuzzy_max_distance >= detector.fuzzy_min_length {
        return Err(ConfigError::Validation(format!(
            "fuzzy_max_distance ({}) must be smaller than fuzzy_min_length ({})",
            detector.fuzzy_max_distance, detector.fuzzy_min_length
        )));
    }

    for cue in detector.positive_cues.iter().chain(&detector.negative_cues) {
        if cue.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sentiment cues must be non-empty".to_string(),
            ));
        }
    }

    for (engine, weight) in &tuning.engine_weights.0 {
        if !weight.is_finite() || *weight <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "engine '{engine}' has invalid weight {weight}; must be a positive number"
            )));
        }
    }

    Ok(())
}
