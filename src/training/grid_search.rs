//! Exhaustive grid search with stratified cross-validation

use super::cross_validation::{CVResults, CVStrategy, CrossValidator};
use super::metrics::Scoring;
use super::models::ModelKind;
use super::params::{ParamGrid, ParamSet};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of one evaluated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position in the candidate list
    pub trial_id: usize,
    pub params: ParamSet,
    pub cv: CVResults,
    pub duration_secs: f64,
}

/// All successful trials of one search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub kind: ModelKind,
    pub trials: Vec<TrialResult>,
    /// Candidates that failed to build, fit or score
    pub n_failed: usize,
    best_trial_idx: Option<usize>,
}

impl SearchResult {
    fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            trials: Vec::new(),
            n_failed: 0,
            best_trial_idx: None,
        }
    }

    /// Record a trial. Only a strictly higher mean replaces the best, so the
    /// first maximum in candidate order wins.
    fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();
        let is_better = match self.best_trial_idx {
            None => !result.cv.mean_score.is_nan(),
            Some(best_idx) => result.cv.mean_score > self.trials[best_idx].cv.mean_score,
        };
        if is_better {
            self.best_trial_idx = Some(idx);
        }
        self.trials.push(result);
    }

    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    pub fn best_params(&self) -> Option<&ParamSet> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_trial().map(|t| t.cv.mean_score)
    }
}

/// Grid search over one model kind
#[derive(Debug, Clone)]
pub struct GridSearch {
    cv: usize,
    scoring: Scoring,
    parallel: bool,
    random_state: u64,
}

impl GridSearch {
    pub fn new(cv: usize, scoring: Scoring) -> Self {
        Self {
            cv,
            scoring,
            parallel: true,
            random_state: 42,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Evaluate every grid candidate and return the ranked results.
    ///
    /// Fails with `TuningError` when the grid has no candidates or none of
    /// them could be evaluated.
    pub fn search(
        &self,
        kind: ModelKind,
        grid: &ParamGrid,
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_classes: usize,
    ) -> Result<SearchResult> {
        let tuning_error = |reason: String| PipelineError::TuningError {
            model: kind.name().to_string(),
            reason,
        };

        let candidates = grid.candidates();
        if candidates.is_empty() {
            return Err(tuning_error("parameter grid yields no candidates".to_string()));
        }

        let splits = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: self.cv, shuffle: true })
            .with_random_state(self.random_state)
            .split(x.nrows(), Some(y))
            .map_err(|e| tuning_error(e.to_string()))?;

        let evaluate = |(trial_id, params): (usize, &ParamSet)| -> Result<TrialResult> {
            let start = Instant::now();
            let mut scores = Vec::with_capacity(splits.len());
            for split in &splits {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train: Array1<f64> = split.train_indices.iter().map(|&i| y[i]).collect();
                let x_test = x.select(Axis(0), &split.test_indices);
                let y_test: Array1<f64> = split.test_indices.iter().map(|&i| y[i]).collect();

                let mut model = kind.build(params, n_classes, self.random_state)?;
                model.fit(&x_train, &y_train)?;
                let proba = model.predict_proba(&x_test)?;
                scores.push(self.scoring.score(&y_test, &proba)?);
            }
            Ok(TrialResult {
                trial_id,
                params: params.clone(),
                cv: CVResults::from_scores(scores),
                duration_secs: start.elapsed().as_secs_f64(),
            })
        };

        // Collected in candidate order either way
        let outcomes: Vec<Result<TrialResult>> = if self.parallel {
            candidates.par_iter().enumerate().map(evaluate).collect()
        } else {
            candidates.iter().enumerate().map(evaluate).collect()
        };

        let mut result = SearchResult::new(kind);
        for (params, outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Ok(trial) => {
                    debug!(model = %kind, params = %params, score = trial.cv.mean_score, "Candidate evaluated");
                    result.add_trial(trial);
                }
                Err(e) => {
                    warn!(model = %kind, params = %params, error = %e, "Candidate failed");
                    result.n_failed += 1;
                }
            }
        }

        if result.best_trial().is_none() {
            return Err(tuning_error(format!(
                "all {} candidates failed to fit or score",
                candidates.len()
            )));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::params::ParamValue;

    fn blobs() -> (Array2<f64>, Array1<f64>) {
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let base = if i % 2 == 0 { 0.0 } else { 4.0 };
            base + ((i * 7 + j * 3) % 10) as f64 * 0.1
        });
        let y: Array1<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        (x, y)
    }

    #[test]
    fn test_search_picks_a_candidate() {
        let (x, y) = blobs();
        let grid = ParamGrid::new().with("n_neighbors", vec![ParamValue::Int(1), ParamValue::Int(3)]);

        let result = GridSearch::new(3, Scoring::RocAuc)
            .search(ModelKind::KNeighborsClassifier, &grid, &x, &y, 2)
            .unwrap();

        assert_eq!(result.trials.len(), 2);
        assert!(result.best_score().unwrap() > 0.9);
    }

    #[test]
    fn test_first_maximum_wins() {
        let (x, y) = blobs();
        // Both candidates separate the blobs perfectly
        let grid = ParamGrid::new().with("var_smoothing", vec![ParamValue::Float(1e-9), ParamValue::Float(1e-8)]);

        let result = GridSearch::new(4, Scoring::Accuracy)
            .search(ModelKind::GaussianNB, &grid, &x, &y, 2)
            .unwrap();

        assert_eq!(result.best_trial().unwrap().trial_id, 0);
    }

    #[test]
    fn test_empty_axis_is_tuning_error() {
        let (x, y) = blobs();
        let grid = ParamGrid::new().with("var_smoothing", vec![]);
        let err = GridSearch::new(3, Scoring::RocAuc)
            .search(ModelKind::GaussianNB, &grid, &x, &y, 2)
            .unwrap_err();
        assert!(matches!(err, PipelineError::TuningError { .. }));
    }

    #[test]
    fn test_all_candidates_failing_is_tuning_error() {
        let (x, y) = blobs();
        let grid = ParamGrid::new().with("learning_rate", vec![ParamValue::Float(-1.0)]);
        let err = GridSearch::new(3, Scoring::RocAuc)
            .with_parallel(false)
            .search(ModelKind::LogisticRegression, &grid, &x, &y, 2)
            .unwrap_err();
        assert!(matches!(err, PipelineError::TuningError { .. }));
    }
}
