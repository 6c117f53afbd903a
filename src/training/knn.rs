//! K-Nearest Neighbors classifier

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{PipelineError, Result};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

impl DistanceMetric {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "manhattan" => Ok(DistanceMetric::Manhattan),
            other => Err(PipelineError::invalid_param("metric", other, "expected euclidean or manhattan")),
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

impl WeightScheme {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "uniform" => Ok(WeightScheme::Uniform),
            "distance" => Ok(WeightScheme::Distance),
            other => Err(PipelineError::invalid_param("weights", other, "expected uniform or distance")),
        }
    }

    pub(crate) fn weight(&self, dist: f64) -> f64 {
        match self {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / (dist + 1e-10),
        }
    }
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
    n_classes: usize,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig, n_classes: usize) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
            n_classes,
        }
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.config.n_neighbors == 0 {
            return Err(PipelineError::invalid_param("n_neighbors", 0, "must be at least 1"));
        }
        if self.config.n_neighbors > x.nrows() {
            return Err(PipelineError::invalid_param(
                "n_neighbors",
                self.config.n_neighbors,
                &format!("exceeds the {} training samples", x.nrows()),
            ));
        }
        self.x_train = Some(x.to_owned());
        self.y_train = Some(y.to_owned());
        Ok(())
    }

    /// Predict class probabilities (parallelized over samples)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(xt), Some(yt)) => (xt, yt),
            _ => return Err(PipelineError::ModelNotFitted),
        };
        if x.ncols() != x_train.ncols() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n_classes = self.n_classes;
        let config = &self.config;

        let probs: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let point: Vec<f64> = x.row(i).to_vec();
                let neighbors = find_k_nearest(&point, x_train, y_train, config.n_neighbors, config.metric);
                class_probs_from(&neighbors, n_classes, config.weights)
            })
            .collect();

        let flat: Vec<f64> = probs.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), n_classes), flat)?)
    }
}

/// Max-heap entry keeping the k smallest distances
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k)
fn find_k_nearest(
    point: &[f64],
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let dist = compute_distance(point, row.iter().copied(), metric);
        if heap.len() < k {
            heap.push(DistLabel(dist, y_train[i]));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, y_train[i]));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

fn compute_distance(a: &[f64], b: impl Iterator<Item = f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b).map(|(ai, bi)| (ai - bi).abs()).sum(),
    }
}

fn class_probs_from(neighbors: &[(f64, f64)], n_classes: usize, weights: WeightScheme) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    let mut total = 0.0;
    for &(dist, label) in neighbors {
        let class_idx = label as usize;
        if class_idx < n_classes {
            let w = weights.weight(dist);
            counts[class_idx] += w;
            total += w;
        }
    }
    if total > 0.0 {
        counts.iter_mut().for_each(|c| *c /= total);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_classifier() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [0.2, 0.0], [5.0, 5.0], [5.1, 5.0], [5.0, 5.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut knn = KNNClassifier::new(KNNConfig { n_neighbors: 3, ..Default::default() }, 2);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_proba(&array![[0.05, 0.05], [5.05, 5.05]]).unwrap();
        assert_eq!(proba[[0, 0]], 1.0);
        assert_eq!(proba[[1, 1]], 1.0);
    }

    #[test]
    fn test_distance_weighting_favors_closest() {
        let x = array![[0.0], [1.0], [1.1]];
        let y = array![0.0, 1.0, 1.0];

        let config = KNNConfig {
            n_neighbors: 3,
            metric: DistanceMetric::Manhattan,
            weights: WeightScheme::Distance,
        };
        let mut knn = KNNClassifier::new(config, 2);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_proba(&array![[0.01]]).unwrap();
        assert!(proba[[0, 0]] > 0.9);
    }

    #[test]
    fn test_too_many_neighbors() {
        let mut knn = KNNClassifier::new(KNNConfig { n_neighbors: 5, ..Default::default() }, 2);
        assert!(knn.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).is_err());
    }
}
