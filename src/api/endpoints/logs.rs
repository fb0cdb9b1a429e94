//! Log endpoints.
//!
//! - `GET /api/logs`: the dashboard's own capped sanitization log
//! - `GET /api/backend/logs`: the backend audit log, proxied

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::log::LogEntry;

#[derive(Serialize)]
pub struct LogsResponse {
    pub capacity: usize,
    pub entries: Vec<LogEntry>,
}

/// `GET /api/logs`: most recent first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<LogsResponse>, ApiError> {
    let state = ctx.core.dashboard()?;
    Ok(Json(LogsResponse {
        capacity: state.log.capacity(),
        entries: state.log.entries().cloned().collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct BackendLogsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct BackendLogsResponse {
    pub backend_url: String,
    pub records: Vec<Value>,
}

/// `GET /api/backend/logs?limit=N`: 502 when the backend cannot be reached.
pub async fn backend(
    State(ctx): State<ApiContext>,
    Query(query): Query<BackendLogsQuery>,
) -> Result<Json<BackendLogsResponse>, ApiError> {
    let backend = ctx.core.backend();
    let mut records = backend.audit_log().await?;
    if let Some(limit) = query.limit {
        records.truncate(limit);
    }
    Ok(Json(BackendLogsResponse {
        backend_url: backend.describe(),
        records,
    }))
}
