//! Label encoding for the target column

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Text form of a label cell. Integral floats print without a fraction so
/// `1` and `1.0` name the same class.
fn label_text(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Float64(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", v as i64)),
        AnyValue::Float32(v) if v.fract() == 0.0 && v.abs() < 1e7 => Some(format!("{}", v as i64)),
        other => Some(other.to_string()),
    }
}

/// Maps sorted unique label values to `0..n_classes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder with known classes, in encoded order
    pub fn from_classes(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    fn values(labels: &Column) -> Result<Vec<String>> {
        (0..labels.len())
            .map(|i| {
                label_text(labels.get(i)?).ok_or_else(|| {
                    PipelineError::DataError(format!("label column '{}' has a null at row {}", labels.name(), i))
                })
            })
            .collect()
    }

    /// Learn the classes. Numeric labels sort numerically, others lexically.
    pub fn fit(&mut self, labels: &Column) -> Result<&mut Self> {
        let mut classes = Self::values(labels)?;
        classes.sort();
        classes.dedup();
        let numeric: Option<Vec<f64>> = classes.iter().map(|c| c.parse::<f64>().ok()).collect();
        if let Some(keys) = numeric {
            let mut keyed: Vec<(f64, String)> = keys.into_iter().zip(classes).collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            classes = keyed.into_iter().map(|(_, c)| c).collect();
        }
        if classes.is_empty() {
            return Err(PipelineError::DataError("label column is empty".to_string()));
        }
        self.classes = classes;
        Ok(self)
    }

    pub fn transform(&self, labels: &Column) -> Result<Array1<f64>> {
        if self.classes.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        Self::values(labels)?
            .iter()
            .map(|v| {
                self.classes
                    .iter()
                    .position(|c| c == v)
                    .map(|i| i as f64)
                    .ok_or_else(|| PipelineError::DataError(format!("unknown label '{}'", v)))
            })
            .collect()
    }

    pub fn fit_transform(&mut self, labels: &Column) -> Result<Array1<f64>> {
        self.fit(labels)?;
        self.transform(labels)
    }

    /// Decode class indices back to labels as a named column. The column is
    /// Int64 when every class is an integer, String otherwise.
    pub fn inverse_transform(&self, name: &str, indices: &[usize]) -> Result<Column> {
        let decoded: Vec<&str> = indices
            .iter()
            .map(|&i| {
                self.classes
                    .get(i)
                    .map(String::as_str)
                    .ok_or_else(|| PipelineError::DataError(format!("class index {} out of range", i)))
            })
            .collect::<Result<_>>()?;

        let as_ints: Option<Vec<i64>> = decoded.iter().map(|s| s.parse::<i64>().ok()).collect();
        Ok(match as_ints {
            Some(ints) => Column::new(name.into(), ints),
            None => Column::new(name.into(), decoded),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_labels_sort_numerically() {
        let labels = Column::new("Result".into(), &[1i64, -1, 10, 1, -1]);
        let mut encoder = LabelEncoder::new();
        let y = encoder.fit_transform(&labels).unwrap();

        assert_eq!(encoder.classes(), &["-1", "1", "10"]);
        assert_eq!(y.to_vec(), vec![1.0, 0.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_float_labels_match_integers() {
        let labels = Column::new("Result".into(), &[0.0f64, 1.0, 1.0]);
        let mut encoder = LabelEncoder::new();
        encoder.fit(&labels).unwrap();
        assert_eq!(encoder.classes(), &["0", "1"]);
    }

    #[test]
    fn test_inverse_transform_types() {
        let encoder = LabelEncoder::from_classes(vec!["-1".to_string(), "1".to_string()]);
        let col = encoder.inverse_transform("Predictions", &[1, 0, 1]).unwrap();
        assert_eq!(col.dtype(), &DataType::Int64);

        let encoder = LabelEncoder::from_classes(vec!["no".to_string(), "yes".to_string()]);
        let col = encoder.inverse_transform("Predictions", &[1, 0]).unwrap();
        assert_eq!(col.dtype(), &DataType::String);
        assert!(encoder.inverse_transform("Predictions", &[2]).is_err());
    }

    #[test]
    fn test_null_label_rejected() {
        let labels = Column::new("Result".into(), &[Some("a"), None]);
        assert!(matches!(LabelEncoder::new().fit(&labels), Err(PipelineError::DataError(_))));
    }

    #[test]
    fn test_unknown_label_on_transform() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&Column::new("y".into(), &["a", "b"])).unwrap();
        assert!(encoder.transform(&Column::new("y".into(), &["c"])).is_err());
    }
}
