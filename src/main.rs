//! Churn Scoring Service - Main Entry Point
//!
//! Loads the fitted artifacts once, then serves `POST /predict`.

use anyhow::Result;
use churn_scoring_service::{
    config::{AppConfig, LoggingConfig},
    models::{ArtifactLoader, ChurnScorer},
    server,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;

    info!("Starting Churn Scoring Service");
    info!(
        bind = %config.server.bind_addr(),
        models_dir = %config.models.models_dir,
        threshold = config.scoring.threshold,
        "Configuration loaded successfully"
    );

    // Artifacts are loaded exactly once; any failure aborts startup
    let loader = ArtifactLoader::with_threads(config.models.onnx_threads);
    let artifacts = loader.load_all(&config.models)?;
    let scorer = Arc::new(ChurnScorer::new(artifacts, config.scoring.threshold)?);

    server::start_server(&config.server, scorer).await
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("churn_scoring_service={},tower_http=info", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
