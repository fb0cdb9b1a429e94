use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::rehydration::RehydrationToken;
use super::BackendError;

// ═══════════════════════════════════════════════════════════
// Stages and run phases
// ═══════════════════════════════════════════════════════════

/// The five backend stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sanitize,
    Context,
    Llm,
    OutputFilter,
    Final,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Sanitize,
        Stage::Context,
        Stage::Llm,
        Stage::OutputFilter,
        Stage::Final,
    ];

    /// Backend route for this stage.
    pub fn endpoint(self) -> &'static str {
        match self {
            Stage::Sanitize => "/api/sanitize",
            Stage::Context => "/api/context",
            Stage::Llm => "/api/llm",
            Stage::OutputFilter => "/api/output-filter",
            Stage::Final => "/api/final",
        }
    }

    /// Phase the dashboard shows while this stage's request is in flight.
    pub fn phase(self) -> RunPhase {
        match self {
            Stage::Sanitize => RunPhase::Sanitizing,
            Stage::Context => RunPhase::Analyzing,
            Stage::Llm => RunPhase::Querying,
            Stage::OutputFilter => RunPhase::Filtering,
            Stage::Final => RunPhase::Finalizing,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sanitize => write!(f, "sanitize"),
            Self::Context => write!(f, "context"),
            Self::Llm => write!(f, "llm"),
            Self::OutputFilter => write!(f, "output-filter"),
            Self::Final => write!(f, "final"),
        }
    }
}

/// Where the current (or last) run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Sanitizing,
    Analyzing,
    Querying,
    Filtering,
    Finalizing,
    Done,
    Failed { stage: Stage },
}

impl RunPhase {
    /// True while a stage request is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunPhase::Sanitizing
                | RunPhase::Analyzing
                | RunPhase::Querying
                | RunPhase::Filtering
                | RunPhase::Finalizing
        )
    }

    /// Stage the phase belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunPhase::Sanitizing => Some(Stage::Sanitize),
            RunPhase::Analyzing => Some(Stage::Context),
            RunPhase::Querying => Some(Stage::Llm),
            RunPhase::Filtering => Some(Stage::OutputFilter),
            RunPhase::Finalizing => Some(Stage::Final),
            RunPhase::Failed { stage } => Some(*stage),
            RunPhase::Idle | RunPhase::Done => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Stage results
// ═══════════════════════════════════════════════════════════

/// An entity the backend detected and replaced with a placeholder.
///
/// Unknown fields are kept so the entity list reaches the final stage
/// exactly as the backend produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Entity {
    pub entity: String,
    pub label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Entity {
    fn from(mut fields: Map<String, Value>) -> Self {
        let mut take = |key: &str| {
            fields
                .remove(key)
                .as_ref()
                .and_then(super::wire::text)
                .unwrap_or_default()
        };
        let entity = take("entity");
        let label = take("label");
        Self {
            entity,
            label,
            extra: fields,
        }
    }
}

/// Stage 1 output, minus the rehydration map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizationResult {
    pub sanitized: String,
    /// Risk score, clamped to [0,100].
    pub risk: u8,
    pub entities: Vec<Entity>,
    /// Placeholder summary when the backend reports one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities_summary: Vec<Value>,
    /// The backend's own preliminary context label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_context: Option<String>,
}

/// Stage 2 output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextResult {
    pub category: Option<String>,
    /// Confidence as an integer percentage.
    pub confidence: Option<u8>,
    /// Confidence exactly as the backend reported it, forwarded downstream.
    #[serde(skip)]
    pub raw_confidence: Option<f64>,
}

/// Stage 3 output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmResult {
    pub answer: String,
    pub confidence: f64,
    /// Free-form explanation payload (string or list, as the backend sends it).
    pub explanations: Value,
    pub fallback_used: bool,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl LlmResult {
    /// Explanations flattened to display text.
    pub fn explanation_text(&self) -> Option<String> {
        match &self.explanations {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let lines: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .filter(|s| !s.trim().is_empty())
                    .collect();
                if lines.is_empty() {
                    None
                } else {
                    Some(lines.join("\n"))
                }
            }
            other => Some(other.to_string()),
        }
    }
}

/// Stage 4 output. Serialized field names match what the final stage expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    /// The model answer that was sent for filtering.
    pub original: String,
    #[serde(rename = "safe_sanitized_text")]
    pub safe_text: String,
    pub leak_detected: bool,
    pub notes: Option<String>,
}

/// Stage 5 output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    pub text: String,
    /// Final-stage score when the backend reported one.
    pub risk: Option<u8>,
}

/// A stage result paired with the rehydration map the stage returned, if any.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub result: T,
    pub rehydration_map: Option<RehydrationToken>,
}

/// Backend `/health` answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendHealth {
    #[serde(default)]
    pub status: String,
}

impl BackendHealth {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

// ═══════════════════════════════════════════════════════════
// Run outcomes
// ═══════════════════════════════════════════════════════════

/// Why a trigger did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyInput,
    AlreadyRunning,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "input is empty"),
            Self::AlreadyRunning => write!(f, "a run is already in progress"),
        }
    }
}

/// Coarse classification of a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    Timeout,
    HttpStatus,
    InvalidResponse,
    Client,
    /// The run was dropped before the stage answered.
    Interrupted,
}

/// Which stage stopped a run, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub run_id: Uuid,
    pub stage: Stage,
    pub kind: FailureKind,
    /// HTTP status for `HttpStatus` failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl RunFailure {
    pub fn new(run_id: Uuid, stage: Stage, error: &BackendError) -> Self {
        let (kind, status) = match error {
            BackendError::Connection(_) => (FailureKind::Connection, None),
            BackendError::Timeout(_) => (FailureKind::Timeout, None),
            BackendError::Status { status, .. } => (FailureKind::HttpStatus, Some(*status)),
            BackendError::ResponseParsing(_) => (FailureKind::InvalidResponse, None),
            BackendError::HttpClient(_) => (FailureKind::Client, None),
        };
        Self {
            run_id,
            stage,
            kind,
            status,
            message: error.to_string(),
        }
    }

    pub fn interrupted(run_id: Uuid, stage: Stage) -> Self {
        Self {
            run_id,
            stage,
            kind: FailureKind::Interrupted,
            status: None,
            message: "run was interrupted before the stage finished".into(),
        }
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.message)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResults {
    pub run_id: Uuid,
    pub sanitization: SanitizationResult,
    pub context: ContextResult,
    pub llm: LlmResult,
    pub filter: FilterResult,
    #[serde(rename = "final")]
    pub final_result: FinalResult,
}

impl PipelineResults {
    /// Final-panel score: the final stage's score, else the sanitize score.
    pub fn final_risk(&self) -> u8 {
        self.final_result.risk.unwrap_or(self.sanitization.risk)
    }
}

/// Result of triggering a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The trigger was a no-op; nothing was sent and state is unchanged.
    Skipped(SkipReason),
    Completed(Box<PipelineResults>),
    Failed(RunFailure),
}
