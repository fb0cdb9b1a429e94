//! Dashboard view models.
//!
//! Everything here is a pure function of a `DashboardState` snapshot. The
//! same `DashboardView` is serialized for the browser and rendered to text
//! for the terminal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::pipeline::confidence::{format_confidence, to_percent};
use crate::pipeline::risk::{RiskBand, RISK_MAX};
use crate::pipeline::types::{RunFailure, RunPhase, Stage};
use crate::pipeline::DashboardState;

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// What a panel shows.
///
/// Data wins over the loading flag: once a stage has produced its result
/// the panel stays `Ready` while later stages run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Loading,
    Ready(T),
    Empty { message: &'static str },
}

impl<T> Panel<T> {
    fn resolve(data: Option<T>, loading: bool, empty_message: &'static str) -> Self {
        match data {
            Some(data) => Panel::Ready(data),
            None if loading => Panel::Loading,
            None => Panel::Empty {
                message: empty_message,
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Panel::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(data) => Some(data),
            _ => None,
        }
    }
}

pub const EMPTY_SANITIZED: &str = "Sanitized input will appear here.";
pub const EMPTY_CONTEXT: &str = "No context analysis yet.";
pub const EMPTY_LLM: &str = "No model response yet.";
pub const EMPTY_FILTER: &str = "No filtered output yet.";
pub const EMPTY_FINAL: &str = "No final output yet.";
pub const EMPTY_LOG: &str = "No sanitization runs yet.";

// ---------------------------------------------------------------------------
// Panel payloads
// ---------------------------------------------------------------------------

/// Score plus the band it falls in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskBadge {
    pub score: u8,
    pub band: RiskBand,
    pub color: &'static str,
}

impl RiskBadge {
    /// Scores above the scale are shown as the maximum.
    pub fn new(score: u8) -> Self {
        let score = score.min(RISK_MAX);
        let band = RiskBand::from_score(score);
        Self {
            score,
            band,
            color: band.color(),
        }
    }
}

/// The risk meter always shows a score; it never has a loading state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskMeterView {
    #[serde(flatten)]
    pub badge: RiskBadge,
    /// Fill ratio in [0,1].
    pub fill: f32,
}

impl RiskMeterView {
    pub fn new(score: u8) -> Self {
        let badge = RiskBadge::new(score);
        Self {
            badge,
            fill: f32::from(badge.score) / f32::from(RISK_MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedView {
    pub text: String,
    pub entity_count: usize,
    pub labels: Vec<String>,
    /// The sanitizer's own context label, before the context stage runs.
    pub detected_context: Option<String>,
    pub placeholders: Vec<PlaceholderView>,
}

/// One row of the sanitizer's placeholder summary. The original entity
/// text in the summary is never copied here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderView {
    pub placeholder: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PlaceholderView {
    fn from_summary(entry: &Value) -> Option<Self> {
        let placeholder = entry.get("placeholder")?.as_str()?;
        let kind = entry.get("type").and_then(Value::as_str).unwrap_or("");
        Some(Self {
            placeholder: placeholder.to_string(),
            kind: kind.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextView {
    pub category: Option<String>,
    /// "73%" or "—".
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmView {
    pub answer: String,
    pub confidence: String,
    pub explanation: Option<String>,
    pub fallback_used: bool,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterView {
    pub original: String,
    pub safe_text: String,
    pub leak_detected: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalView {
    pub text: String,
    pub risk: RiskBadge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub text: String,
    pub risk: RiskBadge,
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

/// Shown while the most recent run ended in failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBanner {
    pub stage: Stage,
    pub message: String,
}

impl From<&RunFailure> for ErrorBanner {
    fn from(failure: &RunFailure) -> Self {
        Self {
            stage: failure.stage,
            message: failure.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Whole dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub phase: RunPhase,
    pub loading: bool,
    pub run_id: Option<Uuid>,
    pub risk_meter: RiskMeterView,
    pub sanitized: Panel<SanitizedView>,
    pub context: Panel<ContextView>,
    pub llm: Panel<LlmView>,
    pub filter: Panel<FilterView>,
    #[serde(rename = "final")]
    pub final_output: Panel<FinalView>,
    pub logs: Panel<Vec<LogRow>>,
    pub error: Option<ErrorBanner>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time of the last finished run.
    pub elapsed_ms: Option<i64>,
}

pub fn build_view(state: &DashboardState) -> DashboardView {
    let loading = state.loading;

    let sanitized = state.sanitization.as_ref().map(|s| SanitizedView {
        text: s.sanitized.clone(),
        entity_count: s.entities.len(),
        labels: s.entities.iter().map(|e| e.label.clone()).collect(),
        detected_context: s.detected_context.clone(),
        placeholders: s
            .entities_summary
            .iter()
            .filter_map(PlaceholderView::from_summary)
            .collect(),
    });

    let context = state.context.as_ref().map(|c| ContextView {
        category: c.category.clone(),
        confidence: format_confidence(c.confidence),
    });

    let llm = state.llm.as_ref().map(|l| LlmView {
        answer: l.answer.clone(),
        confidence: format_confidence(Some(to_percent(l.confidence))),
        explanation: l.explanation_text(),
        fallback_used: l.fallback_used,
        provider: l.provider.clone(),
    });

    let filter = state.filter.as_ref().map(|f| FilterView {
        original: f.original.clone(),
        safe_text: f.safe_text.clone(),
        leak_detected: f.leak_detected,
        notes: f.notes.clone(),
    });

    let final_output = state
        .final_result
        .as_ref()
        .zip(state.final_risk())
        .map(|(f, risk)| FinalView {
            text: f.text.clone(),
            risk: RiskBadge::new(risk),
        });

    // The log only grows after a sanitize stage, so it shows its own
    // rows during a run rather than a loading placeholder.
    let rows: Vec<LogRow> = state
        .log
        .entries()
        .map(|entry| LogRow {
            text: entry.text.clone(),
            risk: RiskBadge::new(entry.score),
            run_id: entry.run_id,
            recorded_at: entry.recorded_at,
        })
        .collect();
    let logs = if rows.is_empty() {
        Panel::Empty { message: EMPTY_LOG }
    } else {
        Panel::Ready(rows)
    };

    DashboardView {
        phase: state.phase,
        loading,
        run_id: state.run_id,
        risk_meter: RiskMeterView::new(state.risk),
        sanitized: Panel::resolve(sanitized, loading, EMPTY_SANITIZED),
        context: Panel::resolve(context, loading, EMPTY_CONTEXT),
        llm: Panel::resolve(llm, loading, EMPTY_LLM),
        filter: Panel::resolve(filter, loading, EMPTY_FILTER),
        final_output: Panel::resolve(final_output, loading, EMPTY_FINAL),
        logs,
        error: state.last_error.as_ref().map(ErrorBanner::from),
        started_at: state.started_at,
        finished_at: state.finished_at,
        elapsed_ms: state
            .started_at
            .zip(state.finished_at)
            .map(|(start, end)| (end - start).num_milliseconds()),
    }
}
