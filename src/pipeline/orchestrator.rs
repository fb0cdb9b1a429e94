//! Drives the five backend stages in order and publishes each result into
//! the dashboard state as soon as it arrives.
//!
//! A run is split in two steps: `begin` atomically checks the trigger and
//! marks the dashboard busy, `execute` performs the stage calls. The HTTP
//! surface uses the split to answer before the run finishes; the CLI just
//! calls `run`.
//!
//! The state lock is only taken between stage calls, never across an
//! await. The rehydration map lives in this module's locals for the
//! duration of `execute` and is dropped with them.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use uuid::Uuid;

use super::backend::StageBackend;
use super::rehydration::RehydrationToken;
use super::state::DashboardState;
use super::types::{PipelineResults, RunFailure, RunOutcome, SkipReason, Stage};
use super::wire::{ContextPayload, FilterRequest, FinalRequest, LlmRequest};
use super::BackendError;
use crate::core_state::CoreError;

/// Permission to execute one run, returned by `begin`.
///
/// Dropping a ticket before its run finished marks the run failed at the
/// stage in flight and releases the dashboard.
#[must_use = "a started run must be executed"]
pub struct RunTicket {
    run_id: Uuid,
    input: String,
    state: Arc<RwLock<DashboardState>>,
}

impl RunTicket {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl std::fmt::Debug for RunTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunTicket")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        if let Some(stage) = state.abandon(self.run_id) {
            tracing::warn!(run_id = %self.run_id, stage = %stage, "Pipeline run abandoned");
        }
    }
}

/// Which stage failed and how.
struct StageFailure {
    stage: Stage,
    error: BackendError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T, BackendError> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|error| StageFailure { stage, error })
    }
}

enum StageError {
    Backend(StageFailure),
    Core(CoreError),
}

impl From<StageFailure> for StageError {
    fn from(f: StageFailure) -> Self {
        StageError::Backend(f)
    }
}

impl From<CoreError> for StageError {
    fn from(e: CoreError) -> Self {
        StageError::Core(e)
    }
}

pub struct PipelineOrchestrator {
    backend: Arc<dyn StageBackend>,
    state: Arc<RwLock<DashboardState>>,
}

impl PipelineOrchestrator {
    pub fn new(backend: Arc<dyn StageBackend>, log_capacity: usize) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(DashboardState::new(log_capacity))),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StageBackend> {
        &self.backend
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, DashboardState>, CoreError> {
        self.state.read().map_err(|_| CoreError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, DashboardState>, CoreError> {
        self.state.write().map_err(|_| CoreError::LockPoisoned)
    }

    /// A copy of the current dashboard state.
    pub fn snapshot(&self) -> Result<DashboardState, CoreError> {
        Ok(self.read_state()?.clone())
    }

    pub fn is_running(&self) -> bool {
        self.state.read().map(|s| s.loading).unwrap_or(false)
    }

    /// Check the trigger and, if it is accepted, mark the dashboard busy.
    ///
    /// Returns the skip reason when the trigger is a no-op: blank input, or
    /// a run already in progress. State is untouched in that case.
    pub fn begin(&self, input: &str) -> Result<Result<RunTicket, SkipReason>, CoreError> {
        let mut state = self.write_state()?;
        if let Some(reason) = state.reject_reason(input) {
            tracing::debug!(reason = ?reason, "Run trigger ignored");
            return Ok(Err(reason));
        }
        let run_id = Uuid::new_v4();
        state.begin(run_id);
        tracing::info!(run_id = %run_id, input_chars = input.chars().count(), "Pipeline run started");
        Ok(Ok(RunTicket {
            run_id,
            input: input.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    /// Run all five stages for a ticket obtained from `begin`.
    pub async fn execute(&self, ticket: RunTicket) -> Result<RunOutcome, CoreError> {
        let started = Instant::now();
        let run_id = ticket.run_id;

        match self.run_stages(&ticket).await {
            Ok(results) => {
                tracing::info!(
                    run_id = %run_id,
                    risk = results.sanitization.risk,
                    final_risk = results.final_risk(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run completed"
                );
                Ok(RunOutcome::Completed(Box::new(results)))
            }
            Err(StageError::Backend(StageFailure { stage, error })) => {
                let failure = RunFailure::new(run_id, stage, &error);
                tracing::warn!(
                    run_id = %run_id,
                    stage = %stage,
                    kind = ?failure.kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Pipeline run failed"
                );
                self.write_state()?.fail(failure.clone());
                Ok(RunOutcome::Failed(failure))
            }
            Err(StageError::Core(e)) => {
                // Release the busy flag if the lock is still usable.
                if let Ok(mut state) = self.state.write() {
                    state.loading = false;
                }
                Err(e)
            }
        }
    }

    /// `begin` followed by `execute`.
    pub async fn run(&self, input: &str) -> Result<RunOutcome, CoreError> {
        match self.begin(input)? {
            Ok(ticket) => self.execute(ticket).await,
            Err(reason) => Ok(RunOutcome::Skipped(reason)),
        }
    }

    async fn run_stages(&self, ticket: &RunTicket) -> Result<PipelineResults, StageError> {
        let run_id = ticket.run_id;
        let input = ticket.input.as_str();
        let backend = &self.backend;

        // Stage 1
        let sanitize = backend.sanitize(input).await.at(Stage::Sanitize)?;
        let sanitization = sanitize.result;
        let mut rehydration: Option<RehydrationToken> = sanitize.rehydration_map;
        tracing::debug!(
            run_id = %run_id,
            risk = sanitization.risk,
            entities = sanitization.entities.len(),
            has_map = rehydration.is_some(),
            "Sanitize stage done"
        );
        self.write_state()?.apply_sanitization(sanitization.clone());

        // Stage 2
        let context = backend
            .context(input, &sanitization.sanitized)
            .await
            .at(Stage::Context)?;
        tracing::debug!(
            run_id = %run_id,
            category = context.category.as_deref().unwrap_or("-"),
            confidence = ?context.confidence,
            "Context stage done"
        );
        self.write_state()?.apply_context(context.clone());

        // Stage 3
        let llm = backend
            .llm(LlmRequest {
                sanitized: &sanitization.sanitized,
                context: ContextPayload::from(&context),
                rehydration_map: rehydration.as_ref(),
            })
            .await
            .at(Stage::Llm)?;
        if llm.rehydration_map.is_some() {
            rehydration = llm.rehydration_map;
        }
        let llm = llm.result;
        tracing::debug!(
            run_id = %run_id,
            fallback_used = llm.fallback_used,
            answer_chars = llm.answer.chars().count(),
            "LLM stage done"
        );
        self.write_state()?.apply_llm(llm.clone());

        // Stage 4
        let filter = backend
            .output_filter(FilterRequest {
                answer: &llm.answer,
                sanitized: &sanitization.sanitized,
                context: ContextPayload::from(&context),
                rehydration_map: rehydration.as_ref(),
            })
            .await
            .at(Stage::OutputFilter)?;
        if filter.rehydration_map.is_some() {
            rehydration = filter.rehydration_map;
        }
        let filter = filter.result;
        tracing::debug!(
            run_id = %run_id,
            leak_detected = filter.leak_detected,
            "Output filter stage done"
        );
        self.write_state()?.apply_filter(filter.clone());

        // Stage 5
        let final_result = backend
            .finalize(FinalRequest {
                input,
                sanitized: &sanitization.sanitized,
                llm_result: &llm,
                filtered_output: &filter,
                entities: &sanitization.entities,
                context: ContextPayload::from(&context),
                rehydration_map: rehydration.as_ref(),
            })
            .await
            .at(Stage::Final)?;
        drop(rehydration);
        self.write_state()?.apply_final(final_result.clone());

        Ok(PipelineResults {
            run_id,
            sanitization,
            context,
            llm,
            filter,
            final_result,
        })
    }
}
