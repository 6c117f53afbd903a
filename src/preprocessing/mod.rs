//! Data preprocessing module
//!
//! Turns an exported batch table into a dense numeric table:
//! - invalid-value sentinels become nulls
//! - feature columns are coerced to Float64
//! - a null report is written when anything is missing
//! - missing cells are filled by KNN imputation
//! - the label column is split off and encoded

mod encoder;

pub use encoder::LabelEncoder;

use crate::config::{ImputerConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::imputation::{Imputer, KNNImputer};
use crate::training::WeightScheme;
use crate::transform::replace_string_cells;
use crate::utils::DataSaver;
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Extract named columns into a row-major `Array2<f64>`; nulls become NaN
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| {
            let column = df
                .column(name)
                .map_err(|_| PipelineError::ColumnNotFound(name.clone()))?;
            let casted = column.cast(&DataType::Float64)?;
            Ok(casted.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        })
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| col_data[c][r]))
}

/// Batch table preprocessing steps
pub struct Preprocessor<'a> {
    sentinel: &'a str,
    imputer: &'a ImputerConfig,
    null_report_file: &'a Path,
}

impl<'a> Preprocessor<'a> {
    pub fn new(sentinel: &'a str, imputer: &'a ImputerConfig, null_report_file: &'a Path) -> Self {
        Self {
            sentinel,
            imputer,
            null_report_file,
        }
    }

    pub fn from_config(config: &'a PipelineConfig) -> Self {
        Self::new(&config.sentinel, &config.imputer, &config.paths.null_report_file)
    }

    /// Null every string cell holding the sentinel, bare or in its quoted form
    pub fn replace_invalid_with_null(&self, df: &DataFrame) -> Result<DataFrame> {
        let (df, bare) = replace_string_cells(df, self.sentinel, None)?;
        let quoted = format!("'{}'", self.sentinel);
        let (df, quoted) = replace_string_cells(&df, &quoted, None)?;
        info!(replaced = bare + quoted, "Replaced invalid values with null");
        Ok(df)
    }

    /// Cast every column except the label to Float64. Text that does not
    /// parse becomes null; a column with no parseable value is an error.
    pub fn coerce_numeric(&self, df: &DataFrame, label_column: Option<&str>) -> Result<DataFrame> {
        let mut result = df.clone();
        for col in df.get_columns() {
            if Some(col.name().as_str()) == label_column || col.dtype() == &DataType::Float64 {
                continue;
            }
            let before = col.len() - col.null_count();
            let casted = col.cast(&DataType::Float64)?;
            let after = casted.len() - casted.null_count();
            if before > 0 && after == 0 {
                return Err(PipelineError::DataError(format!(
                    "column '{}' holds no numeric values",
                    col.name()
                )));
            }
            if after < before {
                debug!(column = %col.name(), nulled = before - after, "Non-numeric cells set to null");
            }
            result = result.with_column(casted)?.clone();
        }
        Ok(result)
    }

    /// Whether any cell is null. When one is, a per-column report is
    /// written with `columns` and `missing values count`.
    pub fn is_null_present(&self, df: &DataFrame) -> Result<bool> {
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let counts: Vec<u64> = df.get_columns().iter().map(|c| c.null_count() as u64).collect();
        let total: u64 = counts.iter().sum();

        if total == 0 {
            info!("No null values present");
            return Ok(false);
        }

        let mut report = DataFrame::new(vec![
            Column::new("columns".into(), names),
            Column::new("missing values count".into(), counts),
        ])?;
        DataSaver::save_csv(&mut report, self.null_report_file)?;
        info!(nulls = total, report = %self.null_report_file.display(), "Null values found, report written");
        Ok(true)
    }

    /// Fill missing numeric cells with KNN imputation. Rows whose label is
    /// null are dropped first. Present cells keep their values.
    pub fn impute_missing(&self, df: &DataFrame, label_column: Option<&str>) -> Result<DataFrame> {
        let df = match label_column.and_then(|l| df.column(l).ok()) {
            Some(label) if label.null_count() > 0 => {
                let mask = label.is_not_null();
                let kept = df.filter(&mask)?;
                info!(dropped = df.height() - kept.height(), "Dropped rows with a null label");
                kept
            }
            _ => df.clone(),
        };

        let numeric: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| is_numeric(c.dtype()))
            .map(|c| c.name().to_string())
            .collect();
        if numeric.is_empty() || df.height() == 0 {
            return Ok(df);
        }

        let x = columns_to_array2(&df, &numeric)?;
        let weights = WeightScheme::parse(&self.imputer.weights)?;
        let mut imputer = KNNImputer::new(self.imputer.n_neighbors)
            .with_weights(weights)
            .with_feature_names(numeric.clone());
        let filled = imputer.fit_transform(&x)?;

        let mut result = df.clone();
        for (j, name) in numeric.iter().enumerate() {
            let original = df.column(name)?;
            if original.null_count() == 0 {
                continue;
            }
            let values: Vec<f64> = filled.column(j).to_vec();
            result = result.with_column(Column::new(name.as_str().into(), values))?.clone();
        }

        info!(
            rows = result.height(),
            columns = numeric.len(),
            n_neighbors = self.imputer.n_neighbors,
            "Imputed missing values"
        );
        Ok(result)
    }

    /// Split the table into features and the label column
    pub fn separate_label_feature(&self, df: &DataFrame, label_column: &str) -> Result<(DataFrame, Column)> {
        let label = df
            .column(label_column)
            .map_err(|_| PipelineError::ColumnNotFound(label_column.to_string()))?
            .clone();
        let features = df.drop(label_column)?;
        debug!(label = label_column, features = features.width(), "Separated label from features");
        Ok((features, label))
    }

    /// Sentinel replacement, coercion and, when needed, imputation
    pub fn prepare(&self, df: &DataFrame, label_column: Option<&str>) -> Result<DataFrame> {
        let df = self.replace_invalid_with_null(df)?;
        let df = self.coerce_numeric(&df, label_column)?;
        if self.is_null_present(&df)? {
            self.impute_missing(&df, label_column)
        } else {
            Ok(df)
        }
    }
}
