//! HTTP server for calcd

use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use calc_common::{CalcConfig, VisionClient};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub config: CalcConfig,
    pub vision: Arc<dyn VisionClient>,
}

impl AppState {
    pub fn new(config: CalcConfig, vision: Arc<dyn VisionClient>) -> Self {
        Self { config, vision }
    }
}

/// Assemble routes and middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    let state = Arc::new(state);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::calculate_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.bind_addr();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
