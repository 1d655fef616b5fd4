//! Health check and operation metrics endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::observe::OperationCount;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
///
/// Health check endpoint for monitoring.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "castdesk-profiles".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub operations: Vec<OperationCount>,
}

/// GET /api/metrics
///
/// Reconciler outcome counters since startup.
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        operations: state.metrics.snapshot(),
    })
}

/// Build health and metrics routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/metrics", get(get_metrics))
}
