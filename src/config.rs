//! Pipeline configuration
//!
//! Loaded once per process from TOML, validated, then shared by reference.
//! The config path is resolved in priority order:
//! 1. `--config` command-line argument
//! 2. `KOLOSAL_PIPELINE_CONFIG` environment variable
//! 3. `params.toml` in the working directory

use crate::error::{PipelineError, Result};
use crate::server::ServerConfig;
use crate::training::{ModelKind, ParamGrid, Scoring};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "KOLOSAL_PIPELINE_CONFIG";
/// Config file used when neither the CLI nor the environment names one
pub const DEFAULT_CONFIG_FILE: &str = "params.toml";

/// Resolve which config file to load
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Shared file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// File whose first line is the batch filename pattern
    pub regex_file: PathBuf,
    /// Where the per-column null report is written
    #[serde(default = "default_null_report")]
    pub null_report_file: PathBuf,
    /// Where predictions are written
    #[serde(default = "default_prediction_output")]
    pub prediction_output_file: PathBuf,
}

fn default_null_report() -> PathBuf {
    PathBuf::from("preprocessing_data/null_values.csv")
}

fn default_prediction_output() -> PathBuf {
    PathBuf::from("Prediction_Output_File/Predictions.csv")
}

/// Directories and collection for one run type (train or predict)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub schema_file: PathBuf,
    pub raw_batch_dir: PathBuf,
    pub good_dir: PathBuf,
    pub bad_dir: PathBuf,
    pub collection: String,
    pub export_csv_file: PathBuf,
}

/// Document store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("store"),
            database: "pipeline".to_string(),
        }
    }
}

/// Model artifact slots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub root: PathBuf,
    pub trained: String,
    pub staging: String,
    pub production: String,
    /// Artifact file extension including the dot
    pub save_format: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models"),
            trained: "trained".to_string(),
            staging: "staging".to_string(),
            production: "production".to_string(),
            save_format: ".json".to_string(),
        }
    }
}

/// KNN imputation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerConfig {
    pub n_neighbors: usize,
    pub weights: String,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 3,
            weights: "uniform".to_string(),
        }
    }
}

/// Held-out split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.33,
            random_state: 42,
        }
    }
}

/// Grid search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub cv: usize,
    pub scoring: Scoring,
    pub parallel: bool,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            cv: 5,
            scoring: Scoring::RocAuc,
            parallel: true,
        }
    }
}

/// A `[[models]]` entry as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelEntry {
    kind: String,
    #[serde(default)]
    grid: ParamGrid,
}

/// A validated model entry
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub grid: ParamGrid,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Label column name
    pub target_column: String,
    /// Literal marking an invalid cell in raw batches
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    pub paths: PathsConfig,
    pub train: RunConfig,
    pub predict: RunConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub imputer: ImputerConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub tuner: TunerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(rename = "models")]
    model_entries: Vec<ModelEntry>,
    #[serde(skip)]
    models: Vec<ModelSpec>,
}

fn default_sentinel() -> String {
    "?".to_string()
}

/// Which run configuration a stage operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Train,
    Predict,
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunKind::Train => write!(f, "train"),
            RunKind::Predict => write!(f, "predict"),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: PipelineConfig = toml::from_str(content)?;
        config.models = config.validate()?;
        Ok(config)
    }

    /// Validated model entries in configured order
    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn run(&self, kind: RunKind) -> &RunConfig {
        match kind {
            RunKind::Train => &self.train,
            RunKind::Predict => &self.predict,
        }
    }

    fn validate(&self) -> Result<Vec<ModelSpec>> {
        if self.target_column.trim().is_empty() {
            return Err(PipelineError::ConfigError("target_column must not be empty".to_string()));
        }
        if self.sentinel.is_empty() {
            return Err(PipelineError::ConfigError("sentinel must not be empty".to_string()));
        }
        if self.model_entries.is_empty() {
            return Err(PipelineError::ConfigError("at least one [[models]] entry is required".to_string()));
        }
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(PipelineError::ConfigError(format!(
                "split.test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }
        if self.tuner.cv < 2 {
            return Err(PipelineError::ConfigError(format!("tuner.cv must be at least 2, got {}", self.tuner.cv)));
        }
        if self.imputer.n_neighbors == 0 {
            return Err(PipelineError::ConfigError("imputer.n_neighbors must be at least 1".to_string()));
        }
        if !matches!(self.imputer.weights.as_str(), "uniform" | "distance") {
            return Err(PipelineError::ConfigError(format!(
                "imputer.weights must be uniform or distance, got '{}'",
                self.imputer.weights
            )));
        }
        if self.artifacts.save_format.trim().is_empty() {
            return Err(PipelineError::ConfigError("artifacts.save_format must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut models = Vec::with_capacity(self.model_entries.len());
        for entry in &self.model_entries {
            let kind: ModelKind = entry.kind.parse()?;
            if !seen.insert(kind) {
                return Err(PipelineError::ConfigError(format!("model {} is listed more than once", kind)));
            }
            kind.validate_grid(&entry.grid)?;
            models.push(ModelSpec {
                kind,
                grid: entry.grid.clone(),
            });
        }
        Ok(models)
    }
}
