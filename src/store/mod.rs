//! Document store for validated batch rows
//!
//! Rows are stored as JSON documents, one collection per run type. The
//! store assigns each document an `_id` on insert; exports drop it again.

mod loader;
mod local;

pub use loader::BatchLoader;
pub use local::LocalDocumentStore;

use crate::error::Result;
use polars::prelude::*;
use serde_json::{Map, Number, Value};

/// Identifier field added to every stored document
pub const ID_FIELD: &str = "_id";

/// One stored row; keys keep their insertion order
pub type Document = Map<String, Value>;

/// Storage backend for batch documents
pub trait DocumentStore: Send + Sync {
    /// Insert documents, returning how many were written. No deduplication.
    fn insert_many(&self, database: &str, collection: &str, docs: Vec<Document>) -> Result<usize>;

    /// Every document in insertion order
    fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Document>>;

    fn count(&self, database: &str, collection: &str) -> Result<usize>;

    /// Remove a collection; dropping a missing collection is not an error
    fn drop_collection(&self, database: &str, collection: &str) -> Result<()>;
}

fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => Number::from_f64(v as f64).map_or(Value::Null, Value::Number),
        AnyValue::Float64(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => Value::String(other.to_string()),
    }
}

/// Convert every row of a frame into a document keyed by column name
pub fn frame_to_documents(df: &DataFrame) -> Result<Vec<Document>> {
    let columns = df.get_columns();
    let mut docs = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut doc = Document::new();
        for col in columns {
            doc.insert(col.name().to_string(), any_value_to_json(col.get(row)?));
        }
        docs.push(doc);
    }
    Ok(docs)
}

fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a frame from documents. Column order is first-seen key order;
/// each column is Int64, Float64, Boolean or String depending on its values.
pub fn documents_to_frame(docs: &[Document]) -> Result<DataFrame> {
    let mut keys: Vec<String> = Vec::new();
    for doc in docs {
        for key in doc.keys() {
            if key != ID_FIELD && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    let mut columns = Vec::with_capacity(keys.len());
    for key in &keys {
        let values: Vec<&Value> = docs.iter().map(|d| d.get(key).unwrap_or(&Value::Null)).collect();
        let present = || values.iter().filter(|v| !v.is_null());

        let column = if present().all(|v| v.is_i64()) {
            let data: Vec<Option<i64>> = values.iter().map(|v| v.as_i64()).collect();
            Column::new(key.as_str().into(), data)
        } else if present().all(|v| v.is_number()) {
            let data: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
            Column::new(key.as_str().into(), data)
        } else if present().all(|v| v.is_boolean()) {
            let data: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
            Column::new(key.as_str().into(), data)
        } else {
            let data: Vec<Option<String>> = values.iter().map(|v| json_to_text(v)).collect();
            Column::new(key.as_str().into(), data)
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_to_documents_keeps_order_and_nulls() {
        let df = DataFrame::new(vec![
            Column::new("b".into(), &[Some(1i64), None]),
            Column::new("a".into(), &[Some("x"), Some("'?'")]),
        ])
        .unwrap();

        let docs = frame_to_documents(&df).unwrap();
        assert_eq!(docs.len(), 2);
        let keys: Vec<&String> = docs[0].keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(docs[1]["b"], Value::Null);
        assert_eq!(docs[1]["a"], json!("'?'"));
    }

    #[test]
    fn test_documents_to_frame_infers_types() {
        let docs: Vec<Document> = vec![
            json!({"_id": "1", "n": 1, "f": 1, "s": "a"}),
            json!({"_id": "2", "n": 2, "f": 2.5, "s": 3}),
            json!({"_id": "3", "n": null, "f": 0.5, "extra": true}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let df = documents_to_frame(&docs).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["n", "f", "s", "extra"]);
        assert_eq!(df.column("n").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("f").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("s").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("extra").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("n").unwrap().null_count(), 1);
    }
}
