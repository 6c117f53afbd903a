//! Missing value imputation
//!
//! Missing cells are `NaN` in the dense matrices built from batch tables.

mod knn;

pub use knn::KNNImputer;

use crate::error::Result;
use ndarray::Array2;

/// Fills `NaN` cells of a feature matrix
pub trait Imputer: Send + Sync {
    /// Learn whatever the imputer needs from a matrix that may hold `NaN`
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Return a copy of `x` with every `NaN` replaced; present cells are kept
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[inline]
pub(crate) fn is_missing(v: f64) -> bool {
    v.is_nan()
}
