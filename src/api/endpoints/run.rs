//! `POST /api/run`: trigger a pipeline run.
//!
//! The run is spawned on the runtime and the handler answers at once; the
//! browser then polls `/api/dashboard` for progress.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::{RunOutcome, SkipReason};

#[derive(Deserialize)]
pub struct RunRequest {
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

pub async fn start(
    State(ctx): State<ApiContext>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RunResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let orchestrator = ctx.core.orchestrator().clone();
    let ticket = match orchestrator.begin(&req.input)? {
        Ok(ticket) => ticket,
        Err(SkipReason::AlreadyRunning) => return Err(ApiError::RunInProgress),
        Err(reason @ SkipReason::EmptyInput) => {
            return Ok((
                StatusCode::OK,
                Json(RunResponse {
                    status: "skipped",
                    run_id: None,
                    reason: Some(reason),
                }),
            ));
        }
    };

    let run_id = ticket.run_id();
    tokio::spawn(async move {
        match orchestrator.execute(ticket).await {
            Ok(RunOutcome::Failed(failure)) => {
                tracing::debug!(run_id = %failure.run_id, stage = %failure.stage, "Background run failed");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(run_id = %run_id, error = %e, "Background run aborted"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunResponse {
            status: "started",
            run_id: Some(run_id),
            reason: None,
        }),
    ))
}
