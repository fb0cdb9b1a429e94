pub mod backend;
pub mod confidence;
pub mod http;
pub mod log;
pub mod mock;
pub mod orchestrator;
pub mod rehydration;
pub mod risk;
pub mod state;
pub mod types;
pub mod wire;

use std::time::Duration;

use thiserror::Error;

pub use backend::StageBackend;
pub use orchestrator::{PipelineOrchestrator, RunTicket};
pub use state::DashboardState;
pub use types::{RunOutcome, RunPhase, SkipReason, Stage};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
