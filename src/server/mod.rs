//! HTTP server
//!
//! Exposes the training and prediction pipelines over HTTP. Runs are
//! serialized within one process and execute on the blocking pool.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::config::PipelineConfig;
use crate::store::LocalDocumentStore;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; any origin when unset or `*`
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty()),
        }
    }
}

/// Start the server for a loaded pipeline configuration
pub async fn run_server(config: PipelineConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let server = config.server.clone();

    let store = Arc::new(LocalDocumentStore::new(&config.store.root));
    let state = Arc::new(AppState::new(config, store));
    let app = create_router(state, &server);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    info!(
        host = %server.host,
        port = server.port,
        address = %addr,
        started_at = %start_time.to_rfc3339(),
        "Pipeline server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl+c");
            return;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_toml_overrides_defaults() {
        let config: ServerConfig = toml::from_str("port = 5000").unwrap();
        assert_eq!(config.port, 5000);
        assert!(!config.host.is_empty());
    }
}
