//! Integration test: Server API endpoints

use axum::body::Body;
use axum::http::{Request, StatusCode};
use kolosal_pipeline::config::PipelineConfig;
use kolosal_pipeline::server::{create_router, AppState};
use kolosal_pipeline::store::LocalDocumentStore;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

/// Config whose schema and batch files do not exist, so every run fails
fn empty_config(root: &Path) -> PipelineConfig {
    let r = root.display();
    let toml = format!(
        r#"
target_column = "Result"

[paths]
regex_file = '{r}/regex.txt'
null_report_file = '{r}/null_values.csv'
prediction_output_file = '{r}/Predictions.csv'

[train]
schema_file = '{r}/schema_training.json'
raw_batch_dir = '{r}/Training_Batch_Files'
good_dir = '{r}/train/good'
bad_dir = '{r}/train/bad'
collection = "train_batch"
export_csv_file = '{r}/train/InputFile.csv'

[predict]
schema_file = '{r}/schema_prediction.json'
raw_batch_dir = '{r}/Prediction_Batch_Files'
good_dir = '{r}/predict/good'
bad_dir = '{r}/predict/bad'
collection = "predict_batch"
export_csv_file = '{r}/predict/InputFile.csv'

[store]
root = '{r}/store'

[artifacts]
root = '{r}/models'

[[models]]
kind = "GaussianNB"
"#
    );
    PipelineConfig::from_toml_str(&toml).unwrap()
}

fn test_app(root: &Path) -> axum::Router {
    let config = empty_config(root);
    let server_config = config.server.clone();
    let store = Arc::new(LocalDocumentStore::new(&config.store.root));
    let state = Arc::new(AppState::new(config, store));
    create_router(state, &server_config)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["production_model"].is_null());
}

#[tokio::test]
async fn test_index_returns_text() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/train"));
    assert!(body.contains("/predict"));
}

#[tokio::test]
async fn test_train_failure_is_reported_in_body() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/train").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Error Occurred!"), "{}", body);
}

#[tokio::test]
async fn test_predict_failure_is_reported_in_body() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/predict").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Error Occurred!"), "{}", body);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(test_app(dir.path()), "/api/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], true);
}
