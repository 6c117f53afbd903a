//! File-backed document store: one JSON-lines file per collection

use super::{Document, DocumentStore, ID_FIELD};
use crate::error::{PipelineError, Result};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores collections under `<root>/<database>/<collection>.jsonl`
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_file(&self, database: &str, collection: &str) -> Result<PathBuf> {
        for name in [database, collection] {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(PipelineError::StoreError(format!("invalid database or collection name '{}'", name)));
            }
        }
        Ok(self.root.join(database).join(format!("{}.jsonl", collection)))
    }
}

impl DocumentStore for LocalDocumentStore {
    fn insert_many(&self, database: &str, collection: &str, docs: Vec<Document>) -> Result<usize> {
        let path = self.collection_file(database, collection)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        let n = docs.len();
        for doc in docs {
            let mut stored = Document::new();
            stored.insert(ID_FIELD.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
            stored.extend(doc.into_iter().filter(|(k, _)| k != ID_FIELD));
            serde_json::to_writer(&mut writer, &stored)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        debug!(database, collection, inserted = n, "Inserted documents");
        Ok(n)
    }

    fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let path = self.collection_file(database, collection)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut docs = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: Document = serde_json::from_str(&line).map_err(|e| {
                PipelineError::StoreError(format!("{}:{}: {}", path.display(), line_no + 1, e))
            })?;
            docs.push(doc);
        }
        Ok(docs)
    }

    fn count(&self, database: &str, collection: &str) -> Result<usize> {
        Ok(self.find_all(database, collection)?.len())
    }

    fn drop_collection(&self, database: &str, collection: &str) -> Result<()> {
        let path = self.collection_file(database, collection)?;
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(database, collection, "Dropped collection");
        }
        Ok(())
    }
}
