//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend_url: String,
    pub running: bool,
    pub uptime_secs: u64,
}

/// `GET /api/health`: liveness of the dashboard itself. Does not probe
/// the backend.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        backend_url: ctx.core.backend().describe(),
        running: ctx.core.is_running(),
        uptime_secs: ctx.core.uptime_secs(),
    }))
}
