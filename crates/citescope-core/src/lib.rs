//! Shared types, configuration, and tuning for the citescope workspace.
//!
//! Every other crate speaks in the shapes defined here: raw and classified
//! citations, detected brand mentions, per-keyword analysis read models, and
//! the recommendation/content-gap/score outputs of the optimizer.

pub mod app_config;
pub mod config;
pub mod mock_engine;
pub mod projects;
pub mod tuning;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use projects::{
    load_projects, parse_projects, CompetitorConfig, ProjectConfig, ProjectsFile, Tier,
};
pub use tuning::{load_tuning, DetectorConfig, EngineWeights, Tuning};
pub use types::*;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tuning file {path}: {source}")]
    TuningFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tuning file: {0}")]
    TuningFileParse(#[from] serde_yaml::Error),

    #[error("failed to read projects file {path}: {source}")]
    ProjectsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse projects file: {0}")]
    ProjectsFileParse(serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
