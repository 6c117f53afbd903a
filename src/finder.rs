//! Model finder: tunes every configured model kind and saves the results

use crate::config::{ModelSpec, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::preprocessing::{columns_to_array2, LabelEncoder};
use crate::promotion::{ArtifactStore, ModelArtifact};
use crate::training::{roc_auc, train_test_split, GridSearch, ParamSet, SplitData, TrainedModel};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// A tuned, refitted and saved model with its held-out ROC-AUC
#[derive(Debug, Clone)]
pub struct FoundModel {
    pub score: f64,
    pub name: String,
    pub artifact: ModelArtifact,
}

pub struct ModelFinder<'a> {
    config: &'a PipelineConfig,
    store: &'a ArtifactStore,
}

impl<'a> ModelFinder<'a> {
    pub fn new(config: &'a PipelineConfig, store: &'a ArtifactStore) -> Self {
        Self { config, store }
    }

    /// Grid-search one model kind on the training split and refit the
    /// winning parameters on the whole training split
    pub fn get_best_model(&self, spec: &ModelSpec, train: &SplitData, n_classes: usize) -> Result<(TrainedModel, ParamSet)> {
        let tuner = &self.config.tuner;
        let search = GridSearch::new(tuner.cv, tuner.scoring)
            .with_parallel(tuner.parallel)
            .with_random_state(self.config.split.random_state)
            .search(spec.kind, &spec.grid, &train.x, &train.y, n_classes)?;

        let best = search.best_trial().ok_or_else(|| PipelineError::TuningError {
            model: spec.kind.name().to_string(),
            reason: "no candidate produced a usable score".to_string(),
        })?;
        info!(
            model = %spec.kind,
            trials = search.trials.len(),
            failed = search.n_failed,
            cv_score = best.cv.mean_score,
            scoring = %tuner.scoring,
            "Best parameters found"
        );

        let mut model = spec.kind.build(&best.params, n_classes, self.config.split.random_state)?;
        model.fit(&train.x, &train.y)?;
        Ok((model, best.params.clone()))
    }

    /// Tune, refit, score and save every configured model, in configured
    /// order. All kinds share one stratified train/test split.
    pub fn train_and_save_models(&self, features: &DataFrame, labels: &Column) -> Result<Vec<FoundModel>> {
        let feature_names: Vec<String> = features.get_column_names().iter().map(|s| s.to_string()).collect();
        let x = columns_to_array2(features, &feature_names)?;

        let mut encoder = LabelEncoder::new();
        let y = encoder.fit_transform(labels)?;
        let n_classes = encoder.n_classes();
        if n_classes < 2 {
            return Err(PipelineError::TrainingError(format!(
                "label column '{}' has a single class",
                labels.name()
            )));
        }

        let (train, test) = train_test_split(&x, &y, self.config.split.test_size, self.config.split.random_state)?;
        info!(
            train_rows = train.x.nrows(),
            test_rows = test.x.nrows(),
            features = feature_names.len(),
            classes = n_classes,
            "Split data for model finding"
        );

        let mut found = Vec::with_capacity(self.config.models().len());
        for spec in self.config.models() {
            let start = Instant::now();
            let (model, params) = self.get_best_model(spec, &train, n_classes)?;
            let score = roc_auc(&test.y, &model.predict_proba(&test.x)?)?;

            let artifact = ModelArtifact::new(model, params, feature_names.clone(), encoder.classes().to_vec(), score);
            let path = self.store.trained_path(artifact.name());
            artifact.save(&path)?;
            info!(
                model = %spec.kind,
                roc_auc = score,
                path = %path.display(),
                elapsed_secs = start.elapsed().as_secs_f64(),
                "Saved trained model"
            );

            found.push(FoundModel {
                score,
                name: artifact.name().to_string(),
                artifact,
            });
        }
        Ok(found)
    }
}
