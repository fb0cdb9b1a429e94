//! In-memory dashboard state, owned by the orchestrator.
//!
//! Every transition is a method here so the orchestrator can apply one
//! stage's effects in a single critical section. The rehydration map is
//! never stored in this struct.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::log::{LogEntry, RunLog};
use super::types::{
    ContextResult, FilterResult, FinalResult, LlmResult, RunFailure, RunPhase,
    SanitizationResult, SkipReason, Stage,
};

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub phase: RunPhase,
    pub loading: bool,
    pub run_id: Option<Uuid>,
    /// Sanitize-stage score shown on the risk meter. Survives new runs
    /// until the next sanitize stage overwrites it.
    pub risk: u8,
    pub sanitization: Option<SanitizationResult>,
    pub context: Option<ContextResult>,
    pub llm: Option<LlmResult>,
    pub filter: Option<FilterResult>,
    pub final_result: Option<FinalResult>,
    pub log: RunLog,
    pub last_error: Option<RunFailure>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            phase: RunPhase::Idle,
            loading: false,
            run_id: None,
            risk: 0,
            sanitization: None,
            context: None,
            llm: None,
            filter: None,
            final_result: None,
            log: RunLog::with_capacity(log_capacity),
            last_error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Why a trigger with `input` would be a no-op, if it would be.
    pub fn reject_reason(&self, input: &str) -> Option<SkipReason> {
        if input.trim().is_empty() {
            Some(SkipReason::EmptyInput)
        } else if self.loading {
            Some(SkipReason::AlreadyRunning)
        } else {
            None
        }
    }

    /// Start a run: clear downstream panels (the risk score stays) and
    /// enter the sanitizing phase.
    pub fn begin(&mut self, run_id: Uuid) {
        self.run_id = Some(run_id);
        self.loading = true;
        self.phase = Stage::Sanitize.phase();
        self.sanitization = None;
        self.context = None;
        self.llm = None;
        self.filter = None;
        self.final_result = None;
        self.last_error = None;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
    }

    /// Record sanitize output, update the risk meter, and log the run.
    pub fn apply_sanitization(&mut self, result: SanitizationResult) {
        self.risk = result.risk;
        if let Some(run_id) = self.run_id {
            self.log.record(LogEntry {
                text: result.sanitized.clone(),
                score: result.risk,
                run_id,
                recorded_at: Utc::now(),
            });
        }
        self.sanitization = Some(result);
        self.phase = Stage::Context.phase();
    }

    pub fn apply_context(&mut self, result: ContextResult) {
        self.context = Some(result);
        self.phase = Stage::Llm.phase();
    }

    pub fn apply_llm(&mut self, result: LlmResult) {
        self.llm = Some(result);
        self.phase = Stage::OutputFilter.phase();
    }

    pub fn apply_filter(&mut self, result: FilterResult) {
        self.filter = Some(result);
        self.phase = Stage::Final.phase();
    }

    /// Record the final stage and finish the run. The risk meter is not
    /// touched: the final score lives only in the final panel.
    pub fn apply_final(&mut self, result: FinalResult) {
        self.final_result = Some(result);
        self.finish(RunPhase::Done);
    }

    /// Stop the run at `failure.stage`. Already-applied results (and the
    /// log entry) stay as they are.
    pub fn fail(&mut self, failure: RunFailure) {
        let stage = failure.stage;
        self.last_error = Some(failure);
        self.finish(RunPhase::Failed { stage });
    }

    /// Close a run whose driver went away before it finished, failing it at
    /// the stage that was in flight. Returns that stage, or `None` when
    /// `run_id` is not the active run.
    pub fn abandon(&mut self, run_id: Uuid) -> Option<Stage> {
        if !self.loading || self.run_id != Some(run_id) || !self.phase.is_active() {
            return None;
        }
        let stage = self.phase.stage()?;
        self.fail(RunFailure::interrupted(run_id, stage));
        Some(stage)
    }

    fn finish(&mut self, phase: RunPhase) {
        self.phase = phase;
        self.loading = false;
        self.finished_at = Some(Utc::now());
    }

    /// Score for the final panel: the final stage's, else the sanitize score.
    pub fn final_risk(&self) -> Option<u8> {
        self.final_result
            .as_ref()
            .map(|f| f.risk.unwrap_or(self.risk))
    }
}
