//! HTTP request handlers for API endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, warn};

use crate::types::{ErrorResponse, HealthResponse, TriggerResponse};
use crate::ApiState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Trigger a detection run
///
/// The run executes in the background; the response acknowledges the
/// trigger immediately. While a run is in flight, further triggers are
/// rejected with `409 Conflict` rather than queued.
pub async fn trigger_run(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    match state.controller.try_start() {
        Ok(run_id) => {
            info!("Accepted detection run trigger: run_id={}", run_id);
            Ok((
                StatusCode::ACCEPTED,
                Json(TriggerResponse {
                    run_id,
                    status: "accepted".to_string(),
                }),
            ))
        }
        Err(e) => {
            warn!("Rejected detection run trigger: {}", e);
            Err((
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// Get controller status and the last run summary
pub async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.controller.status().await)
}
