//! Batch prediction with the production model

use crate::error::Result;
use crate::preprocessing::columns_to_array2;
use crate::promotion::{ArtifactStore, ModelArtifact};
use crate::store::frame_to_documents;
use crate::utils::DataSaver;
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column holding decoded predictions in the output file
pub const PREDICTIONS_COLUMN: &str = "Predictions";

/// Rows shown in the prediction preview
const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutput {
    pub output_file: PathBuf,
    pub model: String,
    pub rows: usize,
    /// First rows of the output as a JSON array of records
    pub preview: String,
}

pub struct Predictor<'a> {
    store: &'a ArtifactStore,
    output_file: &'a Path,
}

impl<'a> Predictor<'a> {
    pub fn new(store: &'a ArtifactStore, output_file: &'a Path) -> Self {
        Self { store, output_file }
    }

    /// Load the single production artifact
    pub fn load_production_model(&self) -> Result<ModelArtifact> {
        let path = self.store.production().current()?;
        let artifact = ModelArtifact::load(&path)?;
        info!(model = artifact.name(), path = %path.display(), "Loaded production model");
        Ok(artifact)
    }

    /// Predict every row of a preprocessed table and write the output CSV
    pub fn predict(&self, df: &DataFrame) -> Result<PredictionOutput> {
        let artifact = self.load_production_model()?;
        let x = columns_to_array2(df, &artifact.feature_names)?;

        let encoded = artifact.model.predict(&x)?;
        let indices: Vec<usize> = encoded.iter().map(|&v| v as usize).collect();
        let predictions = artifact.label_encoder().inverse_transform(PREDICTIONS_COLUMN, &indices)?;

        let mut result = DataFrame::new(vec![predictions])?;
        DataSaver::save_csv(&mut result, self.output_file)?;

        let preview = serde_json::to_string(&frame_to_documents(&result.head(Some(PREVIEW_ROWS)))?)?;
        info!(
            model = artifact.name(),
            rows = result.height(),
            file = %self.output_file.display(),
            "Predictions written"
        );

        Ok(PredictionOutput {
            output_file: self.output_file.to_path_buf(),
            model: artifact.name().to_string(),
            rows: result.height(),
            preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactsConfig;
    use crate::error::PipelineError;
    use crate::training::{ModelKind, ParamSet};
    use ndarray::array;

    fn install_model(store: &ArtifactStore) {
        let mut model = ModelKind::GaussianNB.build(&ParamSet::default(), 2, 42).unwrap();
        let x = array![[0.0], [0.2], [5.0], [5.2]];
        model.fit(&x, &array![0.0, 0.0, 1.0, 1.0]).unwrap();
        let artifact = ModelArtifact::new(
            model,
            ParamSet::default(),
            vec!["a".to_string()],
            vec!["-1".to_string(), "1".to_string()],
            1.0,
        );
        let path = store.trained_path(artifact.name());
        artifact.save(&path).unwrap();
        store.production().install(&path).unwrap();
    }

    #[test]
    fn test_predict_writes_decoded_labels() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(&ArtifactsConfig {
            root: dir.path().join("models"),
            ..ArtifactsConfig::default()
        });
        install_model(&store);

        let output = dir.path().join("out").join("Predictions.csv");
        let df = df!("a" => &[0.1, 5.1, 4.9, 0.0, 0.3, 5.5], "extra" => &[1, 2, 3, 4, 5, 6]).unwrap();
        let result = Predictor::new(&store, &output).predict(&df).unwrap();

        assert_eq!(result.rows, 6);
        assert_eq!(result.model, "GaussianNB");
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().next(), Some("Predictions"));
        assert_eq!(content.lines().nth(1), Some("-1"));
        assert_eq!(content.lines().nth(2), Some("1"));

        let preview: Vec<serde_json::Value> = serde_json::from_str(&result.preview).unwrap();
        assert_eq!(preview.len(), 5);
        assert_eq!(preview[0]["Predictions"], serde_json::json!(-1));
    }

    #[test]
    fn test_missing_feature_column() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(&ArtifactsConfig {
            root: dir.path().join("models"),
            ..ArtifactsConfig::default()
        });
        install_model(&store);

        let df = df!("b" => &[0.1]).unwrap();
        let result = Predictor::new(&store, &dir.path().join("p.csv")).predict(&df);
        assert!(matches!(result, Err(PipelineError::ColumnNotFound(_))));
    }

    #[test]
    fn test_no_production_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(&ArtifactsConfig {
            root: dir.path().join("models"),
            ..ArtifactsConfig::default()
        });
        let df = df!("a" => &[0.1]).unwrap();
        let result = Predictor::new(&store, &dir.path().join("p.csv")).predict(&df);
        assert!(matches!(result, Err(PipelineError::AmbiguousProductionModel { found: 0, .. })));
    }
}
