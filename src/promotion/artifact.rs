//! Persisted model artifacts

use crate::error::{PipelineError, Result};
use crate::preprocessing::LabelEncoder;
use crate::training::{ModelKind, ParamSet, TrainedModel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fitted model plus everything needed to predict with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    /// Parameters chosen by grid search
    pub params: ParamSet,
    pub model: TrainedModel,
    /// Feature columns in training order
    pub feature_names: Vec<String>,
    /// Label values in encoded order
    pub label_classes: Vec<String>,
    /// Held-out ROC-AUC
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(
        model: TrainedModel,
        params: ParamSet,
        feature_names: Vec<String>,
        label_classes: Vec<String>,
        score: f64,
    ) -> Self {
        Self {
            kind: model.kind(),
            params,
            model,
            feature_names,
            label_classes,
            score,
            created_at: Utc::now(),
        }
    }

    /// Artifact name, also the file stem on disk
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn label_encoder(&self) -> LabelEncoder {
        LabelEncoder::from_classes(self.label_classes.clone())
    }

    /// Write the artifact as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::ArtifactNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&json)?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trained").join("GaussianNB.json");

        let mut model = ModelKind::GaussianNB.build(&ParamSet::default(), 2, 42).unwrap();
        let x = array![[0.0, 0.0], [0.1, 0.2], [5.0, 5.0], [5.2, 4.9]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        model.fit(&x, &y).unwrap();

        let artifact = ModelArtifact::new(
            model,
            ParamSet::default(),
            vec!["a".to_string(), "b".to_string()],
            vec!["-1".to_string(), "1".to_string()],
            0.9,
        );
        artifact.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.kind, ModelKind::GaussianNB);
        assert_eq!(loaded.name(), "GaussianNB");
        assert_eq!(loaded.feature_names, artifact.feature_names);
        assert_eq!(loaded.model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelArtifact::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(PipelineError::ArtifactNotFound(_))));
    }
}
