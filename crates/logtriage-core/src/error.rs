//! Error types for triage domain operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Eligibility config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Classification engine error: {0}")]
    Engine(String),

    #[error("Result query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for triage domain operations
pub type TriageResult<T> = std::result::Result<T, TriageError>;
