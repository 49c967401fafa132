//! Air quality prediction service
//!
//! Loads the model bundle once at startup and serves predictions over
//! HTTP. A missing or invalid bundle does not stop the process; the
//! service stays up with predictions unavailable.

use airq_lib::PredictorService;
use airq_server::{api, config::ServiceConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting airq-server");

    let config = ServiceConfig::load().context("Failed to load configuration")?;
    let bundle_path = config.bundle_path();
    info!(port = config.port, bundle_path = %bundle_path.display(), "Service configured");

    let predictor = PredictorService::load(&bundle_path, config.identity());
    let logger = predictor.logger().clone();
    logger.log_startup(
        SERVICE_VERSION,
        &format!("0.0.0.0:{}", config.port),
        predictor.is_ready(),
    );

    let state = Arc::new(api::AppState::new(predictor));

    api::serve(config.port, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
    .context("API server failed")?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
