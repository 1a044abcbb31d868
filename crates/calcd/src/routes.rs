//! API routes for calcd
//!
//! `/` and `/check` answer liveness checks from the canvas frontend;
//! `/calculate` runs one image through the model.

use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use calc_common::{
    analyze_image, decode_data_uri, AnalysisRecord, CalcError, CalculateResponse, CheckResponse,
    ImageData, RootResponse,
};
use std::sync::Arc;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;

/// Format of the `/check` timestamp (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(root))
        .route("/check", get(check))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Server is running".to_string(),
    })
}

async fn check() -> Json<CheckResponse> {
    Json(CheckResponse {
        status: "online".to_string(),
        timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        message: "Backend operational".to_string(),
    })
}

// ============================================================================
// Calculate Routes
// ============================================================================

pub fn calculate_routes() -> Router<AppStateArc> {
    Router::new().route("/calculate", post(calculate))
}

/// Always answers 200 with the envelope; failures only change `status`.
async fn calculate(
    State(state): State<AppStateArc>,
    payload: Result<Json<ImageData>, JsonRejection>,
) -> Json<CalculateResponse> {
    let result = match payload {
        Ok(Json(data)) => process(&state, data).await,
        Err(rejection) => Err(CalcError::Request(rejection.body_text())),
    };

    match result {
        Ok(records) => Json(CalculateResponse::success(records)),
        Err(e) => {
            error!("  /calculate failed: {}", e);
            Json(CalculateResponse::error(e.to_string()))
        }
    }
}

async fn process(state: &AppState, data: ImageData) -> Result<Vec<AnalysisRecord>, CalcError> {
    let ImageData {
        image,
        dict_of_vars,
    } = data;
    info!(
        "  Calculate request: {} payload chars, {} known var(s)",
        image.len(),
        dict_of_vars.len()
    );

    let decoded = tokio::task::spawn_blocking(move || decode_data_uri(&image))
        .await
        .map_err(|e| CalcError::Internal(format!("image decode task failed: {}", e)))??;

    analyze_image(state.vision.as_ref(), &decoded, &dict_of_vars).await
}
