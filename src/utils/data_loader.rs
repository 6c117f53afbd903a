//! CSV loading and saving for batch files

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Loads batch CSV files into data frames
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for type inference (`None` scans the whole file)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a loader that infers column types from every row
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Limit type inference to the first `n` rows
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))
    }
}

/// Writes data frames back to CSV
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating parent directories and overwriting any existing file
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))
    }
}

/// Regular files directly inside `dir`, sorted by name
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// CSV files directly inside `dir`, sorted by name
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("csv")))
        .collect())
}

/// Move a file, falling back to copy-and-delete across filesystems
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if std::fs::rename(src, dst).is_err() {
        std::fs::copy(src, dst)?;
        std::fs::remove_file(src)?;
    }
    Ok(())
}

/// File name as text, for logs and reports
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let mut df = df!("a" => &[1i64, 2, 3], "b" => &["x", "y", "z"]).unwrap();
        DataSaver::save_csv(&mut df, &path).unwrap();

        let loaded = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
        let names: Vec<String> = loaded.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_list_csv_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.csv", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x\n1\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let files = list_csv_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.csv");
        let dst = dir.path().join("b.csv");
        std::fs::write(&src, "x\n1\n").unwrap();

        move_file(&src, &dst).unwrap();
        assert!(!src.exists());
        assert!(dst.exists());
    }
}
