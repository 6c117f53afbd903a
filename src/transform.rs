//! Quoting of invalid-value sentinels in validated batches

use crate::config::RunConfig;
use crate::error::{PipelineError, Result};
use crate::utils::{file_name, list_csv_files, DataLoader, DataSaver};
use polars::prelude::*;
use tracing::{debug, info};

/// Replace every string cell equal to `from` with `to` (or null when `to`
/// is `None`). Returns the updated frame and the number of cells replaced.
pub(crate) fn replace_string_cells(df: &DataFrame, from: &str, to: Option<&str>) -> Result<(DataFrame, usize)> {
    let mut result = df.clone();
    let mut replaced = 0;

    for col in df.get_columns() {
        if col.dtype() != &DataType::String {
            continue;
        }
        let ca = col.str().map_err(|e| PipelineError::DataError(e.to_string()))?;
        let hits = ca.into_iter().filter(|v| *v == Some(from)).count();
        if hits == 0 {
            continue;
        }

        let updated: StringChunked = ca
            .into_iter()
            .map(|v| match v {
                Some(s) if s == from => to,
                other => other,
            })
            .collect();
        result = result
            .with_column(updated.with_name(col.name().clone()).into_series())?
            .clone();
        replaced += hits;
    }

    Ok((result, replaced))
}

/// Rewrites good batch files so the sentinel survives as a quoted literal
pub struct QuotingTransformer<'a> {
    run: &'a RunConfig,
    sentinel: &'a str,
    loader: DataLoader,
}

impl<'a> QuotingTransformer<'a> {
    pub fn new(run: &'a RunConfig, sentinel: &'a str) -> Self {
        Self {
            run,
            sentinel,
            loader: DataLoader::new(),
        }
    }

    /// The quoted form written in place of the sentinel
    pub fn quoted(&self) -> String {
        format!("'{}'", self.sentinel)
    }

    /// Quote sentinels in every good file and rewrite it. Returns the total
    /// number of cells changed; running it twice changes nothing the second time.
    pub fn quote_sentinels(&self) -> Result<usize> {
        let quoted = self.quoted();
        let mut total = 0;

        for path in list_csv_files(&self.run.good_dir)? {
            let df = self.loader.load_csv(&path)?;
            let (mut updated, replaced) = replace_string_cells(&df, self.sentinel, Some(&quoted))?;
            DataSaver::save_csv(&mut updated, &path)?;
            debug!(file = %file_name(&path), replaced, "Quoted sentinel values");
            total += replaced;
        }

        info!(dir = %self.run.good_dir.display(), replaced = total, "Sentinel quoting complete");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn run_config(root: &std::path::Path) -> RunConfig {
        RunConfig {
            schema_file: root.join("schema.json"),
            raw_batch_dir: root.join("raw"),
            good_dir: root.join("good"),
            bad_dir: root.join("bad"),
            collection: "batch".to_string(),
            export_csv_file: root.join("export.csv"),
        }
    }

    #[test]
    fn test_replace_string_cells() {
        let df = df!("a" => &["1", "?", "3"], "b" => &[1i64, 2, 3]).unwrap();
        let (out, replaced) = replace_string_cells(&df, "?", None).unwrap();
        assert_eq!(replaced, 1);
        assert_eq!(out.column("a").unwrap().null_count(), 1);
        assert_eq!(out.column("b").unwrap().null_count(), 0);
    }

    #[test]
    fn test_quote_sentinels_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_config(dir.path());
        std::fs::create_dir_all(&run.good_dir).unwrap();
        let file: PathBuf = run.good_dir.join("batch_20230101_120000.csv");
        std::fs::write(&file, "a,b,Result\n1,?,1\n?,2,0\n3,4,1\n").unwrap();

        let transformer = QuotingTransformer::new(&run, "?");
        assert_eq!(transformer.quote_sentinels().unwrap(), 2);
        assert_eq!(transformer.quote_sentinels().unwrap(), 0);

        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.contains("'?'"));
        assert_eq!(content.lines().count(), 4);
    }
}
