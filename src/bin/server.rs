//! EUR/USD forecaster HTTP server.
//!
//! Loads (or trains) the predictor, then serves the JSON API until Ctrl+C.
//!
//! # Usage
//! ```sh
//! SERVER_PORT=5000 MODEL_FILE=models/forex_predictor.json cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `SERVER_BIND_ADDRESS` / `SERVER_PORT` - Listen address (default: 127.0.0.1:5000)
//! - `TRAIN_DATA_FILE` - Price history CSV used for training and `/api/euro-dollar`
//! - `MODEL_FILE` - Model configuration file (default: models/forex_predictor.json)

use anyhow::{Context, Result};
use eurusd_forecaster::application::model_service::ModelService;
use eurusd_forecaster::config::Config;
use eurusd_forecaster::interfaces::http::{AppState, router};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("EUR/USD Forecaster {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: model={:?}, data={:?}, look_back={}",
        config.model.model_file, config.model.train_data_file, config.model.look_back
    );

    let service = Arc::new(ModelService::new(config.model.clone()));
    if service.initialize().await {
        info!("Model ready.");
    } else {
        warn!("Model unavailable; it will be initialized on the first prediction request.");
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    let app = router(AppState::new(service.clone()), config.server.cors_enabled);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received."),
                Err(e) => {
                    warn!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
        .context("Server error")?;

    service.shutdown().await;
    Ok(())
}
