//! calcd - sketch calculator relay
//!
//! Receives canvas snapshots, asks Gemini what is drawn, and returns
//! normalized expression/result records.

use anyhow::{Context, Result};
use calc_common::{CalcConfig, Environment, GeminiVisionClient};
use calcd::server::{self, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = CalcConfig::from_env();
    init_logging(config.env);

    info!("calcd v{} starting ({:?})", env!("CARGO_PKG_VERSION"), config.env);
    info!("  Model: {} via {}", config.gemini.model, config.gemini.api_base);
    if config.gemini.api_key.is_none() {
        warn!("  GEMINI_API_KEY is not set; /calculate will return errors");
    }

    let vision = GeminiVisionClient::new(config.gemini.clone())
        .context("Failed to initialize Gemini client")?;
    let state = AppState::new(config, Arc::new(vision));

    server::run(state).await
}

fn init_logging(env: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(env.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}
