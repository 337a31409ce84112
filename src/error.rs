//! Error types for configuration and data loading.
//!
//! Evaluation itself never fails: data gaps are classified and counted,
//! and broken counter invariants panic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown sector layer '{0}'")]
    UnknownSectorLayer(String),

    #[error("Unknown requirement '{0}'")]
    UnknownRequirement(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
