//! End-to-end training and prediction runs

use crate::config::{PipelineConfig, RunKind};
use crate::error::{PipelineError, Result};
use crate::finder::ModelFinder;
use crate::predictor::{PredictionOutput, Predictor};
use crate::preprocessing::Preprocessor;
use crate::promotion::{ArtifactStore, PromotionManager, PromotionReport};
use crate::store::{BatchLoader, DocumentStore};
use crate::transform::QuotingTransformer;
use crate::validation::{RawBatchValidator, ValidationReport};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// What the validation stages did for one run
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub report: ValidationReport,
    /// Sentinel cells quoted in good files
    pub quoted: usize,
    /// Documents inserted into the store
    pub inserted: usize,
    /// Rows in the exported table
    pub exported_rows: usize,
}

/// Validate raw batches, quote sentinels, load good files into the store
/// and export the collection. Returns the exported table.
pub fn run_validation_stages(
    config: &PipelineConfig,
    kind: RunKind,
    store: &dyn DocumentStore,
) -> Result<(StageSummary, DataFrame)> {
    let run = config.run(kind);
    info!(run = %kind, "Validation stages started");

    let report = RawBatchValidator::new(run, &config.paths.regex_file).validate_all()?;
    let quoted = QuotingTransformer::new(run, &config.sentinel).quote_sentinels()?;

    let loader = BatchLoader::new(store, run);
    let inserted = loader.insert_good_data(&config.store.database, &run.collection)?;
    let exported = loader.export_to_csv(&config.store.database, &run.collection)?;

    let summary = StageSummary {
        report,
        quoted,
        inserted,
        exported_rows: exported.height(),
    };
    info!(
        run = %kind,
        good = summary.report.good_files().len(),
        bad = summary.report.bad_files().len(),
        inserted,
        exported_rows = summary.exported_rows,
        "Validation stages complete"
    );
    Ok((summary, exported))
}

fn ensure_rows(df: &DataFrame, kind: RunKind) -> Result<()> {
    if df.height() == 0 {
        return Err(PipelineError::DataError(format!("no {} rows survived validation", kind)));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelScore {
    pub name: String,
    pub roc_auc: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainSummary {
    pub validation: StageSummary,
    pub models: Vec<ModelScore>,
    pub promotion: PromotionReport,
    pub duration_secs: f64,
}

/// Validation, preprocessing, model finding and promotion
pub struct TrainPipeline<'a> {
    config: &'a PipelineConfig,
    store: &'a dyn DocumentStore,
}

impl<'a> TrainPipeline<'a> {
    pub fn new(config: &'a PipelineConfig, store: &'a dyn DocumentStore) -> Self {
        Self { config, store }
    }

    pub fn run(&self) -> Result<TrainSummary> {
        let start = Instant::now();
        let (validation, data) = run_validation_stages(self.config, RunKind::Train, self.store)?;
        ensure_rows(&data, RunKind::Train)?;

        let target = self.config.target_column.as_str();
        let preprocessor = Preprocessor::from_config(self.config);
        let data = preprocessor.prepare(&data, Some(target))?;
        let (features, labels) = preprocessor.separate_label_feature(&data, target)?;

        let artifacts = ArtifactStore::new(&self.config.artifacts);
        let found = ModelFinder::new(self.config, &artifacts).train_and_save_models(&features, &labels)?;

        let scored: Vec<(f64, &str)> = found.iter().map(|m| (m.score, m.name.as_str())).collect();
        let promotion = PromotionManager::new(&artifacts).promote(&scored)?;

        let summary = TrainSummary {
            validation,
            models: found
                .iter()
                .map(|m| ModelScore {
                    name: m.name.clone(),
                    roc_auc: m.score,
                })
                .collect(),
            promotion,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            production = %summary.promotion.production,
            models = summary.models.len(),
            duration_secs = summary.duration_secs,
            "Training pipeline complete"
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictSummary {
    pub validation: StageSummary,
    pub prediction: PredictionOutput,
    pub duration_secs: f64,
}

/// Validation, preprocessing and prediction with the production model
pub struct PredictPipeline<'a> {
    config: &'a PipelineConfig,
    store: &'a dyn DocumentStore,
}

impl<'a> PredictPipeline<'a> {
    pub fn new(config: &'a PipelineConfig, store: &'a dyn DocumentStore) -> Self {
        Self { config, store }
    }

    pub fn run(&self) -> Result<PredictSummary> {
        let start = Instant::now();
        let (validation, data) = run_validation_stages(self.config, RunKind::Predict, self.store)?;
        ensure_rows(&data, RunKind::Predict)?;

        // A target column in a prediction batch is ignored so every row gets a prediction
        let target = self.config.target_column.as_str();
        let data = if data.get_column_names().iter().any(|c| c.as_str() == target) {
            info!(column = target, "Dropping target column from prediction batch");
            data.drop(target)?
        } else {
            data
        };
        let data = Preprocessor::from_config(self.config).prepare(&data, None)?;

        let artifacts = ArtifactStore::new(&self.config.artifacts);
        let prediction = Predictor::new(&artifacts, &self.config.paths.prediction_output_file).predict(&data)?;

        let summary = PredictSummary {
            validation,
            prediction,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            file = %summary.prediction.output_file.display(),
            rows = summary.prediction.rows,
            duration_secs = summary.duration_secs,
            "Prediction pipeline complete"
        );
        Ok(summary)
    }
}
