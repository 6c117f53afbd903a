//! Logistic regression classifier

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression trained by gradient descent.
///
/// Two classes fit a single sigmoid; more classes fit one-vs-rest and
/// normalize the per-class scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients, one vector per binary problem
    pub coefficients: Vec<Array1<f64>>,
    /// Fitted intercepts, one per binary problem
    pub intercepts: Vec<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Per-feature standardization learned at fit time
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
    n_classes: usize,
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new(n_classes: usize) -> Self {
        Self {
            coefficients: Vec::new(),
            intercepts: Vec::new(),
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            mean: None,
            scale: None,
            n_classes,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    fn standardize(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(PipelineError::ModelNotFitted),
        };
        if x.ncols() != mean.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", mean.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((x - mean) / scale)
    }

    /// Gradient descent on one binary target
    fn fit_binary(&self, x: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n_samples = x.nrows() as f64;
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples) + (self.alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        (weights, bias)
    }

    /// Fit the model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::TrainingError("cannot fit on zero samples".to_string()));
        }
        if self.learning_rate <= 0.0 {
            return Err(PipelineError::invalid_param("learning_rate", self.learning_rate, "must be positive"));
        }
        if self.alpha < 0.0 {
            return Err(PipelineError::invalid_param("alpha", self.alpha, "must be non-negative"));
        }

        let mean = x
            .mean_axis(ndarray::Axis(0))
            .ok_or_else(|| PipelineError::TrainingError("failed to compute feature means".to_string()))?;
        let scale = x
            .std_axis(ndarray::Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        let xs = self.standardize(x)?;

        let targets: Vec<usize> = if self.n_classes <= 2 { vec![1] } else { (0..self.n_classes).collect() };

        self.coefficients.clear();
        self.intercepts.clear();
        for class in targets {
            let binary = y.mapv(|v| if v as usize == class { 1.0 } else { 0.0 });
            let (w, b) = self.fit_binary(&xs, &binary);
            self.coefficients.push(w);
            self.intercepts.push(b);
        }

        Ok(())
    }

    /// Predict class probabilities, one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.coefficients.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        let xs = self.standardize(x)?;
        let n = xs.nrows();

        if self.n_classes <= 2 {
            let p1 = Self::sigmoid(&(xs.dot(&self.coefficients[0]) + self.intercepts[0]));
            let mut proba = Array2::zeros((n, 2));
            for i in 0..n {
                proba[[i, 0]] = 1.0 - p1[i];
                proba[[i, 1]] = p1[i];
            }
            return Ok(proba);
        }

        let mut proba = Array2::zeros((n, self.n_classes));
        for (k, (w, b)) in self.coefficients.iter().zip(&self.intercepts).enumerate() {
            let pk = Self::sigmoid(&(xs.dot(w) + *b));
            proba.column_mut(k).assign(&pk);
        }
        for mut row in proba.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
        Ok(proba)
    }
}
