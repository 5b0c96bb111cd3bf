//! Health and readiness endpoints.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// GET /health - Basic health check for load balancers.
/// Intentionally unauthenticated.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /healthz - Plain-text liveness probe.
pub async fn healthz() -> &'static str {
    "OK"
}

/// GET /readyz - Readiness probe: proves the store is actually listable.
pub async fn readyz(State(state): State<AppState>) -> Response {
    match state.service.check_storage().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
        }
    }
}
