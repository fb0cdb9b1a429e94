//! `redactlens run`: one pipeline pass, printed as a text dashboard.

use crate::core_state::CoreState;
use crate::dashboard::{build_view, render_text};
use crate::pipeline::RunOutcome;

/// What a single CLI run produced.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Text dashboard after the run.
    pub rendered: String,
}

impl RunReport {
    /// False when a stage failed; the CLI exits non-zero then.
    pub fn succeeded(&self) -> bool {
        !matches!(self.outcome, RunOutcome::Failed(_))
    }
}

pub async fn run_prompt(state: &CoreState, prompt: &str) -> Result<RunReport, String> {
    let outcome = state
        .orchestrator()
        .run(prompt)
        .await
        .map_err(|e| e.to_string())?;

    if let RunOutcome::Skipped(reason) = &outcome {
        tracing::info!(reason = %reason, "Nothing to run");
    }

    let dashboard = state.dashboard().map_err(|e| e.to_string())?;
    Ok(RunReport {
        outcome,
        rendered: render_text(&build_view(&dashboard)),
    })
}
