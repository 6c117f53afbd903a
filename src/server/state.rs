//! Application state management

use crate::config::PipelineConfig;
use crate::store::DocumentStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across handlers
pub struct AppState {
    pub config: Arc<PipelineConfig>,
    pub store: Arc<dyn DocumentStore>,
    /// Held for the duration of a pipeline run
    pub run_lock: Mutex<()>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: PipelineConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            run_lock: Mutex::new(()),
            started_at: chrono::Utc::now(),
        }
    }
}
