//! Kolosal Pipeline - batch ML pipeline
//!
//! Takes raw CSV batches from an intake directory through to a promoted
//! production model and prediction files:
//! - Raw batch validation against a schema and filename pattern
//! - Sentinel quoting and document-store ingestion
//! - Preprocessing with KNN imputation
//! - Grid search over a closed set of classifiers
//! - Promotion into a single-artifact production slot
//! - Batch prediction with the production model
//!
//! # Modules
//!
//! ## Ingestion
//! - [`validation`] - Filename, column-count and empty-column checks
//! - [`transform`] - Sentinel quoting in good batches
//! - [`store`] - Document store load and CSV export
//!
//! ## Modelling
//! - [`preprocessing`] - Null handling, coercion, imputation, label encoding
//! - [`imputation`] - KNN imputer
//! - [`training`] - Classifiers, cross-validation, grid search
//! - [`finder`] - Per-kind tuning, refit and held-out scoring
//! - [`promotion`] - Artifact slots and promotion
//! - [`predictor`] - Prediction with the production model
//!
//! ## Services
//! - [`pipeline`] - End-to-end train and predict runs
//! - [`server`] - HTTP server
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod config;
pub mod error;

// Ingestion
pub mod store;
pub mod transform;
pub mod validation;

// Modelling
pub mod finder;
pub mod imputation;
pub mod predictor;
pub mod preprocessing;
pub mod promotion;
pub mod training;

// Services
pub mod cli;
pub mod pipeline;
pub mod server;

// Utilities
pub mod utils;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{PipelineConfig, RunKind};
    pub use crate::error::{PipelineError, Result};
    pub use crate::pipeline::{PredictPipeline, TrainPipeline};
    pub use crate::promotion::{ArtifactStore, ModelArtifact, PromotionManager, ProductionSlot};
    pub use crate::store::{DocumentStore, LocalDocumentStore};
    pub use crate::training::{ModelKind, ParamGrid, Scoring};
    pub use crate::validation::{RawBatchValidator, ValidationReport, Verdict};
}
