//! Gaussian Naive Bayes classifier

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{PipelineError, Result};

/// Gaussian Naive Bayes over encoded labels `0..n_classes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Mean of each feature per class (`None` for classes absent at fit time)
    means: Vec<Option<Vec<f64>>>,
    /// Variance of each feature per class
    variances: Vec<Option<Vec<f64>>>,
    /// Prior probability of each class
    priors: Vec<f64>,
    /// Portion of the largest feature variance added for stability
    var_smoothing: f64,
    n_classes: usize,
    fitted: bool,
}

impl GaussianNaiveBayes {
    pub fn new(n_classes: usize) -> Self {
        Self {
            means: Vec::new(),
            variances: Vec::new(),
            priors: Vec::new(),
            var_smoothing: 1e-9,
            n_classes,
            fitted: false,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::TrainingError("cannot fit on zero samples".to_string()));
        }
        if self.var_smoothing < 0.0 {
            return Err(PipelineError::invalid_param("var_smoothing", self.var_smoothing, "must be non-negative"));
        }

        // Smoothing is relative to the widest feature, as in common implementations
        let max_var = x
            .var_axis(ndarray::Axis(0), 0.0)
            .iter()
            .cloned()
            .fold(0.0f64, f64::max);
        let epsilon = self.var_smoothing * max_var.max(1e-12);

        self.means = vec![None; self.n_classes];
        self.variances = vec![None; self.n_classes];
        self.priors = vec![0.0; self.n_classes];

        for class in 0..self.n_classes {
            let class_indices: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|(_, &yi)| yi as usize == class)
                .map(|(i, _)| i)
                .collect();
            if class_indices.is_empty() {
                continue;
            }

            // Single-pass Welford's algorithm for mean and variance
            let mut feature_means = vec![0.0; n_features];
            let mut feature_m2 = vec![0.0; n_features];
            for (count, &idx) in class_indices.iter().enumerate() {
                let count = count + 1;
                for (j, &val) in x.row(idx).iter().enumerate() {
                    let delta = val - feature_means[j];
                    feature_means[j] += delta / count as f64;
                    feature_m2[j] += delta * (val - feature_means[j]);
                }
            }
            let n_class = class_indices.len() as f64;
            let feature_vars: Vec<f64> = feature_m2.iter().map(|&m2| m2 / n_class + epsilon).collect();

            self.priors[class] = n_class / n_samples as f64;
            self.means[class] = Some(feature_means);
            self.variances[class] = Some(feature_vars);
        }

        self.fitted = true;
        Ok(())
    }

    /// Predict probabilities, one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let n_samples = x.nrows();
        let mut log_probs = Array2::from_elem((n_samples, self.n_classes), f64::NEG_INFINITY);

        for (i, row) in x.rows().into_iter().enumerate() {
            for class in 0..self.n_classes {
                if let (Some(means), Some(vars)) = (&self.means[class], &self.variances[class]) {
                    let log_likelihood: f64 = row
                        .iter()
                        .zip(means.iter())
                        .zip(vars.iter())
                        .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
                        .sum();
                    log_probs[[i, class]] = self.priors[class].ln() + log_likelihood;
                }
            }
        }

        // Normalize with log-sum-exp
        for mut row in log_probs.rows_mut() {
            let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let log_sum = row.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln();
            row.mapv_inplace(|v| (v - max_val - log_sum).exp());
        }

        Ok(log_probs)
    }
}
