//! Error types for the batch pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Tuning failed for {model}: {reason}")]
    TuningError { model: String, reason: String },

    #[error("Expected exactly one production artifact in {dir:?}, found {found}")]
    AmbiguousProductionModel { dir: PathBuf, found: usize },

    #[error("Artifact not found: {0:?}")]
    ArtifactNotFound(PathBuf),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn invalid_param(name: &str, value: impl ToString, reason: &str) -> Self {
        PipelineError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

impl From<regex::Error> for PipelineError {
    fn from(err: regex::Error) -> Self {
        PipelineError::ConfigError(format!("invalid filename pattern: {}", err))
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
