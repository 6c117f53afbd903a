//! Batch schema descriptor and filename pattern

use crate::error::{PipelineError, Result};
use regex::Regex;
use serde_json::Value;
use std::path::Path;

/// Expected layout of batch files for one run type
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSchema {
    /// Length of the date stamp token in file names
    pub date_stamp_len: usize,
    /// Length of the time stamp token in file names
    pub time_stamp_len: usize,
    /// Expected column names, in schema order
    pub column_names: Vec<String>,
    /// Expected number of columns
    pub column_count: usize,
}

impl BatchSchema {
    /// Read a schema document with `LengthOfDateStampInFile`,
    /// `LengthOfTimeStampInFile`, `ColName` and `NumberofColumns`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::SchemaError(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(content)
            .map_err(|e| PipelineError::SchemaError(format!("malformed schema: {}", e)))?;

        let date_stamp_len = required_len(&doc, "LengthOfDateStampInFile")?;
        let time_stamp_len = required_len(&doc, "LengthOfTimeStampInFile")?;
        let column_count = required_len(&doc, "NumberofColumns")?;

        // ColName maps column name to declared type; a plain list of names is also accepted
        let column_names = match doc.get("ColName") {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| PipelineError::SchemaError("ColName entries must be strings".to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(PipelineError::SchemaError("ColName must be an object or a list".to_string())),
            None => return Err(PipelineError::SchemaError("missing key ColName".to_string())),
        };

        Ok(Self {
            date_stamp_len,
            time_stamp_len,
            column_names,
            column_count,
        })
    }
}

fn required_len(doc: &Value, key: &str) -> Result<usize> {
    let value = doc
        .get(key)
        .ok_or_else(|| PipelineError::SchemaError(format!("missing key {}", key)))?;
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| PipelineError::SchemaError(format!("{} must be a non-negative integer, got {}", key, value)))
}

/// Read the batch filename pattern from the first line of `path`.
///
/// The pattern is anchored at the start of the file name, matching the
/// usual "match from the beginning" semantics of the pattern files.
pub fn read_naming_regex(path: &Path) -> Result<Regex> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::ConfigError(format!("cannot read regex file {}: {}", path.display(), e)))?;
    let line = content.lines().next().map(str::trim).unwrap_or_default();
    if line.is_empty() {
        return Err(PipelineError::ConfigError(format!("regex file {} is empty", path.display())));
    }
    Ok(Regex::new(&format!("^(?:{})", line))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "SampleFileName": "phising_08012020_120000.csv",
        "LengthOfDateStampInFile": 8,
        "LengthOfTimeStampInFile": 6,
        "NumberofColumns": 3,
        "ColName": {"having_IP_Address": "Integer", "URL_Length": "Integer", "Result": "Integer"}
    }"#;

    #[test]
    fn test_parse_schema() {
        let schema = BatchSchema::from_json_str(SCHEMA).unwrap();
        assert_eq!(schema.date_stamp_len, 8);
        assert_eq!(schema.time_stamp_len, 6);
        assert_eq!(schema.column_count, 3);
        assert_eq!(schema.column_names, vec!["having_IP_Address", "URL_Length", "Result"]);
    }

    #[test]
    fn test_missing_key_is_schema_error() {
        let err = BatchSchema::from_json_str(r#"{"LengthOfDateStampInFile": 8}"#).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaError(_)));
    }

    #[test]
    fn test_malformed_is_schema_error() {
        assert!(matches!(BatchSchema::from_json_str("{not json"), Err(PipelineError::SchemaError(_))));
    }

    #[test]
    fn test_regex_first_line_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regex.txt");
        std::fs::write(&path, "batch_[\\d_]+\\d+\\.csv\nignored\n").unwrap();

        let re = read_naming_regex(&path).unwrap();
        assert!(re.is_match("batch_20230101_120000.csv"));
        assert!(!re.is_match("xbatch_20230101_120000.csv"));
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regex.txt");
        std::fs::write(&path, "([unclosed\n").unwrap();
        assert!(matches!(read_naming_regex(&path), Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_missing_regex_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_naming_regex(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
        assert!(err.to_string().contains("absent.txt"));
    }
}
