//! REST API server for the video detection pipeline.
//!
//! Exposes a small control surface over a [`RunController`]:
//! - `POST /api/v1/runs` triggers a detection run (rejected while one is in flight)
//! - `GET /api/v1/status` reports the controller state and last run summary
//! - `GET /health` liveness check

mod handlers;
mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use video_detect_core::RunController;

pub use handlers::*;
pub use types::*;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    /// Controller guarding the single-flight detection run
    pub controller: RunController,
}

impl ApiState {
    #[must_use]
    pub fn new(controller: RunController) -> Self {
        Self { controller }
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Trigger a detection run
        .route("/api/v1/runs", post(trigger_run))
        // Controller state and last run summary
        .route("/api/v1/status", get(get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
