//! Dashboard snapshot endpoint, polled by the browser during a run.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::dashboard::{build_view, DashboardView};

/// `GET /api/dashboard`: every panel of the current dashboard.
pub async fn view(State(ctx): State<ApiContext>) -> Result<Json<DashboardView>, ApiError> {
    let state = ctx.core.dashboard()?;
    Ok(Json(build_view(&state)))
}
