//! XGBoost-style gradient boosting classifier with second-order approximation
//!
//! - Uses both gradient and hessian of the logistic loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - L1 (alpha) and L2 (lambda) regularization, minimum child weight
//!
//! More than two classes are handled one-vs-rest.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: 42,
        }
    }
}

impl XGBoostConfig {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::invalid_param("n_estimators", 0, "must be at least 1"));
        }
        if self.learning_rate <= 0.0 {
            return Err(PipelineError::invalid_param("learning_rate", self.learning_rate, "must be positive"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(PipelineError::invalid_param("subsample", self.subsample, "must be in (0, 1]"));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(PipelineError::invalid_param("colsample_bytree", self.colsample_bytree, "must be in (0, 1]"));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.gamma < 0.0 {
            return Err(PipelineError::invalid_param("reg_lambda/reg_alpha/gamma", "negative", "must be non-negative"));
        }
        Ok(())
    }
}

/// A single node in the boosted tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: impl Fn(usize) -> f64 + Copy) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample(*feature) <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Build a tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();

    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf { weight: leaf_weight };
    }

    let best_split = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, grad, hess, indices, f, config))
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    match best_split {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight: leaf_weight };
            }

            let left = build_xgb_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight: leaf_weight },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g_adj / (h_sum + lambda)
}

/// Best split for a single feature: (feature, threshold, gain)
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<(usize, f64, f64)> {
    let mut sorted_indices: Vec<usize> = indices.to_vec();
    sorted_indices.sort_by(|&a, &b| {
        x[[a, feature]].partial_cmp(&x[[b, feature]]).unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = sorted_indices.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted_indices.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for pos in 0..sorted_indices.len() - 1 {
        let idx = sorted_indices[pos];
        let next_idx = sorted_indices[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        if (x[[idx, feature]] - x[[next_idx, feature]]).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                - (g_total * g_total) / (h_total + lambda));

        if best.map_or(true, |(g, _)| gain > g) {
            best = Some((gain, (x[[idx, feature]] + x[[next_idx, feature]]) / 2.0));
        }
    }

    best.map(|(gain, threshold)| (feature, threshold, gain))
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// One boosted ensemble for a binary target
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryBooster {
    trees: Vec<XGBNode>,
    base_score: f64,
}

impl BinaryBooster {
    fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &XGBoostConfig, seed: u64) -> Self {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        let base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, base_score);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            // Logistic loss: grad = p - y, hess = p * (1 - p)
            let probs: Array1<f64> = raw_preds.mapv(sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, config.subsample);
            let col_indices = subsample(&mut rng, n_features, config.colsample_bytree);

            let tree = build_xgb_tree(x, &grad, &hess, &row_indices, &col_indices, 0, config);

            for i in 0..n_samples {
                raw_preds[i] += config.learning_rate * tree.predict(|j| x[[i, j]]);
            }
            trees.push(tree);
        }

        Self { trees, base_score }
    }

    fn predict_proba(&self, x: &Array2<f64>, learning_rate: f64) -> Array1<f64> {
        (0..x.nrows())
            .map(|i| {
                let raw = self.trees.iter().fold(self.base_score, |acc, tree| {
                    acc + learning_rate * tree.predict(|j| x[[i, j]])
                });
                sigmoid(raw)
            })
            .collect()
    }
}

/// XGBoost classifier (logistic loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    boosters: Vec<BinaryBooster>,
    n_classes: usize,
    n_features: usize,
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig, n_classes: usize) -> Self {
        Self {
            config,
            boosters: Vec::new(),
            n_classes,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() < 2 {
            return Err(PipelineError::TrainingError("need at least two samples".to_string()));
        }
        self.n_features = x.ncols();

        let targets: Vec<usize> = if self.n_classes <= 2 { vec![1] } else { (0..self.n_classes).collect() };
        let config = &self.config;
        self.boosters = targets
            .into_par_iter()
            .map(|class| {
                let binary = y.mapv(|v| if v as usize == class { 1.0 } else { 0.0 });
                BinaryBooster::fit(x, &binary, config, config.random_state.wrapping_add(class as u64))
            })
            .collect();

        Ok(())
    }

    /// Predict class probabilities, one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.boosters.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let lr = self.config.learning_rate;
        if self.n_classes <= 2 {
            let p1 = self.boosters[0].predict_proba(x, lr);
            let mut proba = Array2::zeros((x.nrows(), 2));
            proba.column_mut(0).assign(&p1.mapv(|p| 1.0 - p));
            proba.column_mut(1).assign(&p1);
            return Ok(proba);
        }

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (k, booster) in self.boosters.iter().enumerate() {
            proba.column_mut(k).assign(&booster.predict_proba(x, lr));
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
