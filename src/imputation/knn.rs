//! KNN-based imputation

use crate::error::{PipelineError, Result};
use crate::imputation::{is_missing, Imputer};
use crate::training::WeightScheme;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered float for priority queue
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max heap by distance, lower index wins ties
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Euclidean distance over coordinates present in both rows, scaled up by
/// the fraction of coordinates used. `None` when no coordinate is shared.
fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
    let mut count = 0usize;
    let mut accum = 0.0f64;
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        if is_missing(ai) || is_missing(bi) {
            continue;
        }
        count += 1;
        let d = ai - bi;
        accum += d * d;
    }
    if count == 0 {
        return None;
    }
    Some((accum * a.len() as f64 / count as f64).sqrt())
}

/// KNN-based imputer
///
/// Each missing cell is filled from the `n_neighbors` nearest rows in which
/// that feature is present. Cells that were present are never changed.
#[derive(Debug, Clone)]
pub struct KNNImputer {
    n_neighbors: usize,
    weights: WeightScheme,
    /// Fitted rows, missing cells kept as NaN
    donors: Option<Array2<f64>>,
    /// Per-feature mean used when no donor shares a coordinate
    feature_means: Option<Array1<f64>>,
    /// Column names used in error messages
    feature_names: Option<Vec<String>>,
}

impl KNNImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            weights: WeightScheme::Uniform,
            donors: None,
            feature_means: None,
            feature_names: None,
        }
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    fn feature_label(&self, j: usize) -> String {
        match self.feature_names.as_ref().and_then(|names| names.get(j)) {
            Some(name) => format!("column '{}'", name),
            None => format!("feature {}", j),
        }
    }

    /// k nearest donor rows for `sample` among rows where `feature` is present
    fn find_neighbors(&self, donors: &Array2<f64>, sample: ArrayView1<f64>, feature: usize) -> Vec<(usize, f64)> {
        let k = self.n_neighbors;
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, row) in donors.rows().into_iter().enumerate() {
            if is_missing(row[feature]) {
                continue;
            }
            let Some(dist) = nan_euclidean(sample, row) else {
                continue;
            };
            if heap.len() < k {
                heap.push(DistanceIdx(dist, i));
            } else if let Some(&top) = heap.peek() {
                if DistanceIdx(dist, i) < top {
                    heap.pop();
                    heap.push(DistanceIdx(dist, i));
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistanceIdx(d, i)| (i, d)).collect()
    }

    fn impute_value(&self, donors: &Array2<f64>, means: &Array1<f64>, neighbors: &[(usize, f64)], feature: usize) -> f64 {
        if neighbors.is_empty() {
            return means[feature];
        }

        // An exact match dominates under distance weighting
        if self.weights == WeightScheme::Distance && neighbors.iter().any(|&(_, d)| d == 0.0) {
            let exact: Vec<f64> = neighbors
                .iter()
                .filter(|&&(_, d)| d == 0.0)
                .map(|&(i, _)| donors[[i, feature]])
                .collect();
            return exact.iter().sum::<f64>() / exact.len() as f64;
        }

        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for &(idx, dist) in neighbors {
            let w = self.weights.weight(dist);
            weighted_sum += donors[[idx, feature]] * w;
            weight_sum += w;
        }
        if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            means[feature]
        }
    }
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Imputer for KNNImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::DataError("cannot fit imputer on an empty table".to_string()));
        }

        let mut means = Array1::zeros(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let present: Vec<f64> = column.iter().copied().filter(|v| !is_missing(*v)).collect();
            if present.is_empty() {
                return Err(PipelineError::DataError(format!(
                    "{} has no values to impute from",
                    self.feature_label(j)
                )));
            }
            means[j] = present.iter().sum::<f64>() / present.len() as f64;
        }

        self.donors = Some(x.clone());
        self.feature_means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (donors, means) = match (&self.donors, &self.feature_means) {
            (Some(d), Some(m)) => (d, m),
            _ => return Err(PipelineError::ModelNotFitted),
        };
        if x.ncols() != donors.ncols() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", donors.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let filled: Vec<Vec<(usize, f64)>> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                (0..row.len())
                    .filter(|&j| is_missing(row[j]))
                    .map(|j| {
                        let neighbors = self.find_neighbors(donors, row, j);
                        (j, self.impute_value(donors, means, &neighbors, j))
                    })
                    .collect()
            })
            .collect();

        let mut result = x.clone();
        for (i, cells) in filled.into_iter().enumerate() {
            for (j, value) in cells {
                result[[i, j]] = value;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fills_every_missing_cell() {
        let x = array![
            [1.0, 2.0, f64::NAN],
            [3.0, f64::NAN, 3.0],
            [f64::NAN, 6.0, 5.0],
            [8.0, 8.0, 7.0]
        ];
        let mut imputer = KNNImputer::new(2);
        let out = imputer.fit_transform(&x).unwrap();

        assert!(out.iter().all(|v| !v.is_nan()));
        for ((i, j), v) in x.indexed_iter() {
            if !v.is_nan() {
                assert_eq!(out[[i, j]], *v);
            }
        }
    }

    #[test]
    fn test_uniform_uses_nearest_donors() {
        let x = array![[0.0, 10.0], [0.1, 20.0], [5.0, 100.0], [0.05, f64::NAN]];
        let mut imputer = KNNImputer::new(2);
        let out = imputer.fit_transform(&x).unwrap();
        assert!((out[[3, 1]] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_weighting_prefers_exact_match() {
        let x = array![[1.0, 4.0], [2.0, 8.0], [1.0, f64::NAN]];
        let mut imputer = KNNImputer::new(2).with_weights(WeightScheme::Distance);
        let out = imputer.fit_transform(&x).unwrap();
        assert!((out[[2, 1]] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_column_is_error() {
        let x = array![[1.0, f64::NAN], [2.0, f64::NAN]];
        let mut imputer = KNNImputer::new(1);
        assert!(matches!(imputer.fit(&x), Err(PipelineError::DataError(_))));
    }

    #[test]
    fn test_all_missing_column_error_names_column() {
        let x = array![[1.0, f64::NAN], [2.0, f64::NAN]];
        let mut imputer = KNNImputer::new(1).with_feature_names(vec!["f1".to_string(), "f2".to_string()]);
        let err = imputer.fit(&x).unwrap_err();
        assert!(err.to_string().contains("column 'f2'"), "{}", err);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = KNNImputer::new(1);
        assert!(matches!(imputer.transform(&array![[1.0]]), Err(PipelineError::ModelNotFitted)));
    }
}
