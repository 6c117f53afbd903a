//! Moves validated batches into the document store and back out as CSV

use super::{documents_to_frame, frame_to_documents, DocumentStore};
use crate::config::RunConfig;
use crate::error::Result;
use crate::utils::{file_name, list_csv_files, DataLoader, DataSaver};
use polars::prelude::DataFrame;
use tracing::info;

pub struct BatchLoader<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    run: &'a RunConfig,
    loader: DataLoader,
}

impl<'a, S: DocumentStore + ?Sized> BatchLoader<'a, S> {
    pub fn new(store: &'a S, run: &'a RunConfig) -> Self {
        Self {
            store,
            run,
            loader: DataLoader::new(),
        }
    }

    /// Insert one document per row of every good file. Re-running inserts
    /// the rows again.
    pub fn insert_good_data(&self, database: &str, collection: &str) -> Result<usize> {
        let mut total = 0;
        for path in list_csv_files(&self.run.good_dir)? {
            let df = self.loader.load_csv(&path)?;
            let inserted = self.store.insert_many(database, collection, frame_to_documents(&df)?)?;
            info!(file = %file_name(&path), database, collection, rows = inserted, "Inserted batch into store");
            total += inserted;
        }
        Ok(total)
    }

    /// Read the whole collection and overwrite the export CSV with it
    pub fn export_to_csv(&self, database: &str, collection: &str) -> Result<DataFrame> {
        let docs = self.store.find_all(database, collection)?;
        let mut df = documents_to_frame(&docs)?;
        DataSaver::save_csv(&mut df, &self.run.export_csv_file)?;
        info!(
            database,
            collection,
            rows = df.height(),
            columns = df.width(),
            file = %self.run.export_csv_file.display(),
            "Exported collection to CSV"
        );
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalDocumentStore;

    #[test]
    fn test_insert_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunConfig {
            schema_file: dir.path().join("schema.json"),
            raw_batch_dir: dir.path().join("raw"),
            good_dir: dir.path().join("good"),
            bad_dir: dir.path().join("bad"),
            collection: "train".to_string(),
            export_csv_file: dir.path().join("export").join("input.csv"),
        };
        std::fs::create_dir_all(&run.good_dir).unwrap();
        std::fs::write(run.good_dir.join("b_1_1.csv"), "x,y,Result\n1,'?',1\n2,3,0\n").unwrap();
        std::fs::write(run.good_dir.join("b_1_2.csv"), "x,y,Result\n4,5,1\n").unwrap();

        let store = LocalDocumentStore::new(dir.path().join("store"));
        let loader = BatchLoader::new(&store, &run);
        assert_eq!(loader.insert_good_data("db", "train").unwrap(), 3);

        let df = loader.export_to_csv("db", "train").unwrap();
        assert_eq!(df.shape(), (3, 3));
        assert!(run.export_csv_file.exists());
        let header = std::fs::read_to_string(&run.export_csv_file).unwrap();
        assert!(header.starts_with("x,y,Result"));
    }
}
