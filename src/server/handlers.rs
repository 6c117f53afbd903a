//! Request handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::{error, info};

use super::error::Result;
use super::state::AppState;
use crate::pipeline::{PredictPipeline, TrainPipeline};
use crate::promotion::ArtifactStore;

const INDEX_TEXT: &str = "kolosal-pipeline\n\
\n\
GET /train    validate training batches, tune models and promote the best\n\
GET /predict  validate prediction batches and predict with the production model\n\
GET /health   service status\n";

pub async fn index() -> &'static str {
    INDEX_TEXT
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let artifacts = ArtifactStore::new(&state.config.artifacts);
    let production = artifacts.production().current_name().ok();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "production_model": production,
    }))
}

pub async fn train(State(state): State<Arc<AppState>>) -> Result<String> {
    let _guard = state.run_lock.lock().await;
    info!("Training run requested");

    let config = Arc::clone(&state.config);
    let store = Arc::clone(&state.store);
    let outcome = tokio::task::spawn_blocking(move || TrainPipeline::new(&config, store.as_ref()).run()).await?;

    Ok(match outcome {
        Ok(summary) => {
            info!(production = %summary.promotion.production, "Training run succeeded");
            "Training successfull!!".to_string()
        }
        Err(e) => {
            error!(error = %e, "Training run failed");
            format!("Error Occurred! {}", e)
        }
    })
}

pub async fn predict(State(state): State<Arc<AppState>>) -> Result<String> {
    let _guard = state.run_lock.lock().await;
    info!("Prediction run requested");

    let config = Arc::clone(&state.config);
    let store = Arc::clone(&state.store);
    let outcome = tokio::task::spawn_blocking(move || PredictPipeline::new(&config, store.as_ref()).run()).await?;

    Ok(match outcome {
        Ok(summary) => {
            let output = summary.prediction;
            info!(file = %output.output_file.display(), rows = output.rows, "Prediction run succeeded");
            format!(
                "Prediction File created at {}!!! and few of the predictions are {}",
                output.output_file.display(),
                output.preview
            )
        }
        Err(e) => {
            error!(error = %e, "Prediction run failed");
            format!("Error Occurred! {}", e)
        }
    })
}
