//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state between the CLI commands and
//! the axum dashboard API. It owns the resolved configuration and the
//! pipeline orchestrator, which in turn owns the dashboard state.

use std::sync::Arc;
use std::time::Instant;

use crate::api::DashboardServer;
use crate::config::DashboardConfig;
use crate::pipeline::http::HttpBackend;
use crate::pipeline::{BackendError, DashboardState, PipelineOrchestrator, StageBackend};

// ═══════════════════════════════════════════════════════════
// CoreState: shared by CLI commands and axum REST
// ═══════════════════════════════════════════════════════════

/// Wrapped in `Arc` at startup so the CLI and the API share one instance.
pub struct CoreState {
    pub config: DashboardConfig,
    orchestrator: Arc<PipelineOrchestrator>,
    /// Dashboard API server handle. Uses tokio Mutex for async.
    pub dashboard_server: tokio::sync::Mutex<Option<DashboardServer>>,
    started_at: Instant,
}

impl CoreState {
    /// Build state talking to the HTTP backend named in `config`.
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let backend = HttpBackend::new(&config.backend_url, config.pipeline.timeouts)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Build state around any backend implementation.
    pub fn with_backend(config: DashboardConfig, backend: Arc<dyn StageBackend>) -> Self {
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            backend,
            config.pipeline.log_capacity,
        ));
        Self {
            config,
            orchestrator,
            dashboard_server: tokio::sync::Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<PipelineOrchestrator> {
        &self.orchestrator
    }

    pub fn backend(&self) -> &Arc<dyn StageBackend> {
        self.orchestrator.backend()
    }

    /// Copy of the dashboard state for rendering.
    pub fn dashboard(&self) -> Result<DashboardState, CoreError> {
        self.orchestrator.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
