//! Raw batch validation
//!
//! Sorts incoming batch files into good and bad directories:
//! - filename checks against the naming pattern and stamp lengths (copy)
//! - column count against the schema (move good → bad)
//! - entirely-null columns (move good → bad)
//!
//! Each file ends in exactly one of the two directories. Files never move
//! from bad back to good.

mod schema;

pub use schema::{read_naming_regex, BatchSchema};

use crate::config::RunConfig;
use crate::error::Result;
use crate::utils::{file_name, list_csv_files, list_files, move_file, DataLoader, DataSaver};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Why a file was routed to the bad directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationFailure {
    /// File name does not match the naming pattern
    FilenamePattern,
    /// File name has fewer than three `_`-separated tokens
    StampTokens { found: usize },
    DateStampLength { expected: usize, actual: usize },
    TimeStampLength { expected: usize, actual: usize },
    ColumnCount { expected: usize, actual: usize },
    /// A column holds no values at all
    EmptyColumn { column: String },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::FilenamePattern => write!(f, "file name does not match the naming pattern"),
            ValidationFailure::StampTokens { found } => {
                write!(f, "expected prefix, date and time tokens, found {} token(s)", found)
            }
            ValidationFailure::DateStampLength { expected, actual } => {
                write!(f, "date stamp length {} (expected {})", actual, expected)
            }
            ValidationFailure::TimeStampLength { expected, actual } => {
                write!(f, "time stamp length {} (expected {})", actual, expected)
            }
            ValidationFailure::ColumnCount { expected, actual } => {
                write!(f, "{} columns (expected {})", actual, expected)
            }
            ValidationFailure::EmptyColumn { column } => write!(f, "column '{}' is entirely empty", column),
        }
    }
}

/// Routing decision for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Good,
    Bad(ValidationFailure),
}

impl Verdict {
    pub fn is_good(&self) -> bool {
        matches!(self, Verdict::Good)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileVerdict {
    pub file: String,
    pub verdict: Verdict,
}

/// Final verdict per file, in the order files were first seen
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub verdicts: Vec<FileVerdict>,
}

impl ValidationReport {
    /// Record a verdict, replacing any earlier verdict for the same file
    pub fn record(&mut self, file: impl Into<String>, verdict: Verdict) {
        let file = file.into();
        match self.verdicts.iter_mut().find(|v| v.file == file) {
            Some(existing) => existing.verdict = verdict,
            None => self.verdicts.push(FileVerdict { file, verdict }),
        }
    }

    /// Fold another report's verdicts into this one
    pub fn merge(&mut self, other: ValidationReport) {
        for v in other.verdicts {
            self.record(v.file, v.verdict);
        }
    }

    pub fn verdict_for(&self, file: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.file == file).map(|v| &v.verdict)
    }

    pub fn good_files(&self) -> Vec<&str> {
        self.verdicts
            .iter()
            .filter(|v| v.verdict.is_good())
            .map(|v| v.file.as_str())
            .collect()
    }

    pub fn bad_files(&self) -> Vec<&str> {
        self.verdicts
            .iter()
            .filter(|v| !v.verdict.is_good())
            .map(|v| v.file.as_str())
            .collect()
    }
}

/// Check a batch file name against the pattern and stamp lengths
pub fn check_filename(name: &str, pattern: &Regex, date_len: usize, time_len: usize) -> Verdict {
    if !pattern.is_match(name) {
        return Verdict::Bad(ValidationFailure::FilenamePattern);
    }

    let stem = name.split(".csv").next().unwrap_or(name);
    let tokens: Vec<&str> = stem.split('_').collect();
    if tokens.len() < 3 {
        return Verdict::Bad(ValidationFailure::StampTokens { found: tokens.len() });
    }

    let date = tokens[1].chars().count();
    if date != date_len {
        return Verdict::Bad(ValidationFailure::DateStampLength {
            expected: date_len,
            actual: date,
        });
    }
    let time = tokens[2].chars().count();
    if time != time_len {
        return Verdict::Bad(ValidationFailure::TimeStampLength {
            expected: time_len,
            actual: time,
        });
    }
    Verdict::Good
}

/// Validates the raw batch directory of one run type
pub struct RawBatchValidator<'a> {
    run: &'a RunConfig,
    regex_file: &'a Path,
    loader: DataLoader,
}

impl<'a> RawBatchValidator<'a> {
    pub fn new(run: &'a RunConfig, regex_file: &'a Path) -> Self {
        Self {
            run,
            regex_file,
            loader: DataLoader::new(),
        }
    }

    /// Load the schema descriptor for this run
    pub fn get_schema(&self) -> Result<BatchSchema> {
        let schema = BatchSchema::from_file(&self.run.schema_file)?;
        info!(
            schema = %self.run.schema_file.display(),
            date_stamp_len = schema.date_stamp_len,
            time_stamp_len = schema.time_stamp_len,
            column_count = schema.column_count,
            "Loaded batch schema"
        );
        Ok(schema)
    }

    /// Load the batch filename pattern
    pub fn get_naming_regex(&self) -> Result<Regex> {
        let pattern = read_naming_regex(self.regex_file)?;
        info!(pattern = %pattern, "Loaded filename pattern");
        Ok(pattern)
    }

    /// Copy every raw file into good or bad based on its name
    pub fn partition_by_filename(&self, pattern: &Regex, date_len: usize, time_len: usize) -> Result<ValidationReport> {
        std::fs::create_dir_all(&self.run.good_dir)?;
        std::fs::create_dir_all(&self.run.bad_dir)?;

        let mut report = ValidationReport::default();
        for path in list_files(&self.run.raw_batch_dir)? {
            let name = file_name(&path);
            let verdict = check_filename(&name, pattern, date_len, time_len);
            match &verdict {
                Verdict::Good => {
                    std::fs::copy(&path, self.run.good_dir.join(&name))?;
                    info!(file = %name, "Filename valid, copied to good");
                }
                Verdict::Bad(reason) => {
                    std::fs::copy(&path, self.run.bad_dir.join(&name))?;
                    warn!(file = %name, reason = %reason, "Filename invalid, copied to bad");
                }
            }
            report.record(name, verdict);
        }
        Ok(report)
    }

    /// Move good files whose column count differs from the schema to bad
    pub fn check_column_count(&self, expected_count: usize) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for path in list_csv_files(&self.run.good_dir)? {
            if !path.exists() {
                continue;
            }
            let name = file_name(&path);
            let df = self.loader.load_csv(&path)?;
            if df.width() != expected_count {
                let reason = ValidationFailure::ColumnCount {
                    expected: expected_count,
                    actual: df.width(),
                };
                move_file(&path, &self.run.bad_dir.join(&name))?;
                warn!(file = %name, reason = %reason, "Invalid column count, moved to bad");
                report.record(name, Verdict::Bad(reason));
            }
        }
        Ok(report)
    }

    /// Move good files with any entirely-null column to bad and rewrite the
    /// rest in place with normalized CSV formatting
    pub fn check_missing_columns(&self) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for path in list_csv_files(&self.run.good_dir)? {
            if !path.exists() {
                continue;
            }
            let name = file_name(&path);
            let mut df = self.loader.load_csv(&path)?;
            let empty = df
                .get_columns()
                .iter()
                .find(|c| c.null_count() == c.len())
                .map(|c| c.name().to_string());

            if let Some(column) = empty {
                let reason = ValidationFailure::EmptyColumn { column };
                move_file(&path, &self.run.bad_dir.join(&name))?;
                warn!(file = %name, reason = %reason, "Empty column, moved to bad");
                report.record(name, Verdict::Bad(reason));
            } else {
                DataSaver::save_csv(&mut df, &path)?;
                debug!(file = %name, "No empty columns, rewritten to good");
            }
        }
        Ok(report)
    }

    /// Run schema, pattern, filename, column count and empty-column checks
    pub fn validate_all(&self) -> Result<ValidationReport> {
        info!(raw_dir = %self.run.raw_batch_dir.display(), "Starting raw batch validation");

        let schema = self.get_schema()?;
        let pattern = self.get_naming_regex()?;

        let mut report = self.partition_by_filename(&pattern, schema.date_stamp_len, schema.time_stamp_len)?;
        report.merge(self.check_column_count(schema.column_count)?);
        report.merge(self.check_missing_columns()?);

        info!(
            good = report.good_files().len(),
            bad = report.bad_files().len(),
            "Raw batch validation complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r"^(?:batch_\d+_\d+\.csv)").unwrap()
    }

    #[test]
    fn test_check_filename_good() {
        assert_eq!(check_filename("batch_20230101_120000.csv", &pattern(), 8, 6), Verdict::Good);
    }

    #[test]
    fn test_check_filename_pattern_mismatch() {
        assert_eq!(
            check_filename("other_20230101_120000.csv", &pattern(), 8, 6),
            Verdict::Bad(ValidationFailure::FilenamePattern)
        );
    }

    #[test]
    fn test_check_filename_stamp_lengths() {
        assert_eq!(
            check_filename("batch_2023_12.csv", &pattern(), 8, 6),
            Verdict::Bad(ValidationFailure::DateStampLength { expected: 8, actual: 4 })
        );
        assert_eq!(
            check_filename("batch_20230101_1200.csv", &pattern(), 8, 6),
            Verdict::Bad(ValidationFailure::TimeStampLength { expected: 6, actual: 4 })
        );
    }

    #[test]
    fn test_check_filename_too_few_tokens() {
        let loose = Regex::new(r"^(?:batch.*\.csv)").unwrap();
        assert_eq!(
            check_filename("batch_20230101.csv", &loose, 8, 6),
            Verdict::Bad(ValidationFailure::StampTokens { found: 2 })
        );
    }

    #[test]
    fn test_report_record_replaces() {
        let mut report = ValidationReport::default();
        report.record("a.csv", Verdict::Good);
        report.record("b.csv", Verdict::Good);
        report.record("a.csv", Verdict::Bad(ValidationFailure::ColumnCount { expected: 3, actual: 2 }));

        assert_eq!(report.verdicts.len(), 2);
        assert_eq!(report.good_files(), vec!["b.csv"]);
        assert_eq!(report.bad_files(), vec!["a.csv"]);
    }
}
