//! Kolosal Pipeline - Main Entry Point

use clap::Parser;
use kolosal_pipeline::cli::{cmd_predict, cmd_serve, cmd_status, cmd_train, cmd_validate, load_config, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = async {
        let config = load_config(cli.config.as_deref())?;
        match cli.command {
            Commands::Validate { run } => cmd_validate(&config, run),
            Commands::Train => cmd_train(&config),
            Commands::Predict => cmd_predict(&config),
            Commands::Status => cmd_status(&config),
            Commands::Serve { port, host } => cmd_serve(config, host, port).await,
        }
    }
    .await;

    if let Err(e) = &result {
        tracing::error!(error = ?e, "Command failed");
    }
    result
}
