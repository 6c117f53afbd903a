//! Classification scoring used by model selection

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scoring function used to rank candidates and fitted models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Area under the ROC curve (one-vs-rest macro average for multiclass)
    #[default]
    RocAuc,
    /// Fraction of correctly predicted labels
    Accuracy,
}

impl Scoring {
    /// Score probabilities against encoded labels. Higher is better.
    pub fn score(&self, y_true: &Array1<f64>, proba: &Array2<f64>) -> Result<f64> {
        match self {
            Scoring::RocAuc => roc_auc(y_true, proba),
            Scoring::Accuracy => Ok(accuracy(y_true, &argmax_rows(proba))),
        }
    }
}

impl FromStr for Scoring {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "roc_auc" | "auc" => Ok(Scoring::RocAuc),
            "accuracy" => Ok(Scoring::Accuracy),
            other => Err(PipelineError::ConfigError(format!("unknown scoring '{}'", other))),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scoring::RocAuc => write!(f, "roc_auc"),
            Scoring::Accuracy => write!(f, "accuracy"),
        }
    }
}

/// Index of the largest entry per row. Ties go to the lowest index.
pub fn argmax_rows(proba: &Array2<f64>) -> Array1<f64> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (k, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = k;
                }
            }
            best as f64
        })
        .collect()
}

/// Fraction of exact label matches
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

/// ROC-AUC from class probabilities.
///
/// Binary targets use the positive-class column. With more classes the
/// score is the unweighted mean of one-vs-rest AUCs over classes present
/// in `y_true`.
pub fn roc_auc(y_true: &Array1<f64>, proba: &Array2<f64>) -> Result<f64> {
    if y_true.len() != proba.nrows() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} probability rows", y_true.len()),
            actual: format!("{} probability rows", proba.nrows()),
        });
    }

    let present: Vec<usize> = {
        let mut classes: Vec<usize> = y_true.iter().map(|&v| v as usize).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    };
    if present.len() < 2 {
        return Err(PipelineError::TrainingError(
            "roc_auc is undefined when only one class is present".to_string(),
        ));
    }
    if let Some(&max_class) = present.last() {
        if max_class >= proba.ncols() {
            return Err(PipelineError::ShapeError {
                expected: format!("more than {} probability columns", max_class),
                actual: format!("{} probability columns", proba.ncols()),
            });
        }
    }

    if proba.ncols() == 2 {
        let positives: Vec<bool> = y_true.iter().map(|&v| v as usize == 1).collect();
        return Ok(binary_auc(&positives, proba.column(1)));
    }

    let total: f64 = present
        .iter()
        .map(|&class| {
            let positives: Vec<bool> = y_true.iter().map(|&v| v as usize == class).collect();
            binary_auc(&positives, proba.column(class))
        })
        .sum();
    Ok(total / present.len() as f64)
}

/// Mann-Whitney formulation with average ranks for tied scores
fn binary_auc(positives: &[bool], scores: ArrayView1<f64>) -> f64 {
    let n = scores.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let n_pos = positives.iter().filter(|&&p| p).count() as f64;
    let n_neg = n as f64 - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        return 0.5;
    }
    let rank_sum: f64 = positives
        .iter()
        .zip(&ranks)
        .filter(|(&p, _)| p)
        .map(|(_, &r)| r)
        .sum();
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}
