//! Stratified train/test split

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Features and encoded labels of one side of a split
#[derive(Debug, Clone)]
pub struct SplitData {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

/// Split rows so each class keeps roughly `test_size` of its rows in the
/// held-out part. Classes with at least two rows contribute to both sides.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    random_state: u64,
) -> Result<(SplitData, SplitData)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::invalid_param("test_size", test_size, "must be in (0, 1)"));
    }
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label.round() as i64).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for indices in class_indices.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64) * test_size).round().clamp(1.0, (n - 1) as f64) as usize
        };
        test_indices.extend_from_slice(&indices[..n_test]);
        train_indices.extend_from_slice(&indices[n_test..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(PipelineError::DataError(
            "stratified split resulted in an empty train or test set".to_string(),
        ));
    }
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    let take = |idx: &[usize]| SplitData {
        x: x.select(Axis(0), idx),
        y: idx.iter().map(|&i| y[i]).collect(),
    };
    Ok((take(&train_indices), take(&test_indices)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
        let y: Array1<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        (x, y)
    }

    #[test]
    fn test_split_sizes_and_stratification() {
        let (x, y) = data(30);
        let (train, test) = train_test_split(&x, &y, 0.33, 42).unwrap();

        assert_eq!(train.x.nrows() + test.x.nrows(), 30);
        assert_eq!(test.y.len(), 10);
        let test_ones = test.y.iter().filter(|&&v| v == 1.0).count();
        assert_eq!(test_ones, 5);
    }

    #[test]
    fn test_split_is_reproducible() {
        let (x, y) = data(20);
        let (a, _) = train_test_split(&x, &y, 0.25, 7).unwrap();
        let (b, _) = train_test_split(&x, &y, 0.25, 7).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_rows_keep_their_labels() {
        let (x, y) = data(12);
        let (train, test) = train_test_split(&x, &y, 0.5, 1).unwrap();
        for side in [&train, &test] {
            for (row, &label) in side.x.rows().into_iter().zip(side.y.iter()) {
                let original = (row[0] / 2.0) as usize;
                assert_eq!(y[original], label);
            }
        }
    }

    #[test]
    fn test_invalid_test_size() {
        let (x, y) = data(10);
        assert!(train_test_split(&x, &y, 1.0, 0).is_err());
        assert!(train_test_split(&x, &y, 0.0, 0).is_err());
    }
}
