//! Decision tree classifier

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the class distribution of its samples
    Leaf {
        proba: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            other => Err(PipelineError::invalid_param("criterion", other, "expected gini or entropy")),
        }
    }

    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>(),
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Decision tree classifier over encoded labels `0..n_classes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Restrict split search to these features (used by the forest)
    pub feature_subset: Option<Vec<usize>>,
    n_classes: usize,
    n_features: usize,
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new(n_classes: usize) -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            feature_subset: None,
            n_classes,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::TrainingError("cannot fit a tree on zero samples".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::invalid_param(
                "min_samples_split",
                self.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.min_samples_leaf < 1 {
            return Err(PipelineError::invalid_param(
                "min_samples_leaf",
                self.min_samples_leaf,
                "must be at least 1",
            ));
        }

        self.n_features = x.ncols();
        let labels: Vec<usize> = y.iter().map(|&v| v as usize).collect();
        if let Some(&bad) = labels.iter().find(|&&c| c >= self.n_classes) {
            return Err(PipelineError::TrainingError(format!(
                "label {} outside of 0..{}",
                bad, self.n_classes
            )));
        }

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, &labels, &indices, 0));
        Ok(())
    }

    fn class_counts(&self, labels: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[labels[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        let n = n_samples.max(1) as f64;
        TreeNode::Leaf {
            proba: counts.iter().map(|&c| c as f64 / n).collect(),
            n_samples,
        }
    }

    fn build_tree(&self, x: &Array2<f64>, labels: &[usize], indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(labels, indices);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let parent_impurity = self.criterion.impurity(&counts, n_samples);
        match self.find_best_split(x, labels, indices, parent_impurity) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                let left = Box::new(self.build_tree(x, labels, &left_indices, depth + 1));
                let right = Box::new(self.build_tree(x, labels, &right_indices, depth + 1));

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => self.leaf(&counts, n_samples),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64)> {
        let features: Vec<usize> = match &self.feature_subset {
            Some(subset) => subset.clone(),
            None => (0..self.n_features).collect(),
        };
        let n = indices.len();

        // Each feature scans its sorted values once, moving samples left to right
        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut sorted: Vec<usize> = indices.to_vec();
                sorted.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut left_counts = vec![0usize; self.n_classes];
                let mut right_counts = self.class_counts(labels, indices);
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..n - 1 {
                    let idx = sorted[pos];
                    left_counts[labels[idx]] += 1;
                    right_counts[labels[idx]] -= 1;

                    let current = x[[idx, feature_idx]];
                    let next = x[[sorted[pos + 1], feature_idx]];
                    if (next - current).abs() < 1e-12 {
                        continue;
                    }

                    let left_n = pos + 1;
                    let right_n = n - left_n;
                    if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left_n as f64 * self.criterion.impurity(&left_counts, left_n)
                        + right_n as f64 * self.criterion.impurity(&right_counts, right_n))
                        / n as f64;
                    let gain = parent_impurity - weighted;

                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (current + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // Ties keep the lowest feature index
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(best) if best.2 >= cand.2 => Some(best),
                _ => Some(cand),
            })
            .map(|(f, t, _)| (f, t))
    }

    /// Predict class probabilities, one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let leaf = Self::leaf_for(root, &row.to_vec());
            for (j, &p) in leaf.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    fn leaf_for<'a>(node: &'a TreeNode, sample: &[f64]) -> &'a [f64] {
        match node {
            TreeNode::Leaf { proba, .. } => proba,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::leaf_for(left, sample)
                } else {
                    Self::leaf_for(right, sample)
                }
            }
        }
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(2);
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert!(proba[[0, 0]] > 0.5);
        assert!(proba[[3, 1]] > 0.5);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new(2).with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_entropy_criterion_and_proba_rows() {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let y = array![0.0, 0.0, 2.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(3)
            .with_criterion(Criterion::Entropy)
            .with_max_depth(Some(1));
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unfitted_tree() {
        let tree = DecisionTree::new(2);
        assert!(matches!(
            tree.predict_proba(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_rejects_bad_min_samples_split() {
        let mut tree = DecisionTree::new(2).with_min_samples_split(1);
        assert!(tree.fit(&array![[1.0], [2.0]], &array![0.0, 1.0]).is_err());
    }
}
