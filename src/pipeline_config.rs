//! Per-stage request budgets and dashboard limits.
//!
//! Each backend stage gets its own timeout: the model call is the slowest,
//! the filter and final stages sit in between, and sanitize/context are
//! expected to answer quickly. A timeout is reported like any other stage
//! failure.

use std::time::Duration;

use serde::Serialize;

use crate::pipeline::types::Stage;

/// Number of sanitization records kept in the dashboard log.
pub const LOG_CAPACITY: usize = 20;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Request timeout for every backend stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTimeouts {
    #[serde(with = "duration_secs")]
    pub sanitize: Duration,
    #[serde(with = "duration_secs")]
    pub context: Duration,
    #[serde(with = "duration_secs")]
    pub llm: Duration,
    #[serde(with = "duration_secs")]
    pub output_filter: Duration,
    #[serde(with = "duration_secs")]
    pub finalize: Duration,
}

impl StageTimeouts {
    /// Timeout applied to the request for `stage`.
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Sanitize => self.sanitize,
            Stage::Context => self.context,
            Stage::Llm => self.llm,
            Stage::OutputFilter => self.output_filter,
            Stage::Final => self.finalize,
        }
    }

    /// Same timeout for every stage. Used by tests that need fast failures.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            sanitize: timeout,
            context: timeout,
            llm: timeout,
            output_filter: timeout,
            finalize: timeout,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            sanitize: Duration::from_secs(10),
            context: Duration::from_secs(10),
            llm: Duration::from_secs(20),
            output_filter: Duration::from_secs(15),
            finalize: Duration::from_secs(15),
        }
    }
}

/// Pipeline tuning shared by the CLI and the dashboard server.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub timeouts: StageTimeouts,
    /// Maximum number of entries in the sanitization log.
    pub log_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeouts: StageTimeouts::default(),
            log_capacity: LOG_CAPACITY,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
