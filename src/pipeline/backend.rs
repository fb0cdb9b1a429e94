use async_trait::async_trait;
use serde_json::Value;

use super::types::{
    BackendHealth, ContextResult, FilterResult, FinalResult, LlmResult, SanitizationResult,
    StageOutput,
};
use super::wire::{FilterRequest, FinalRequest, LlmRequest};
use super::BackendError;

/// The sanitization backend, one method per stage (allows mocking).
///
/// Implementations must not inspect or alter the rehydration map: it goes
/// out exactly as it came in.
#[async_trait]
pub trait StageBackend: Send + Sync {
    async fn sanitize(&self, input: &str)
        -> Result<StageOutput<SanitizationResult>, BackendError>;

    async fn context(&self, input: &str, sanitized: &str) -> Result<ContextResult, BackendError>;

    async fn llm(&self, request: LlmRequest<'_>) -> Result<StageOutput<LlmResult>, BackendError>;

    async fn output_filter(
        &self,
        request: FilterRequest<'_>,
    ) -> Result<StageOutput<FilterResult>, BackendError>;

    async fn finalize(&self, request: FinalRequest<'_>) -> Result<FinalResult, BackendError>;

    /// Liveness probe.
    async fn health(&self) -> Result<BackendHealth, BackendError>;

    /// The backend's own metadata-only audit records, newest first.
    async fn audit_log(&self) -> Result<Vec<Value>, BackendError>;

    /// Human-readable location, for status output.
    fn describe(&self) -> String;
}
