//! Scripted in-memory backend for exercising the orchestrator.
//!
//! Returns configurable stage results, can fail any stage on demand,
//! can hold the sanitize stage until released, and records every request
//! body exactly as it would have been sent over HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::backend::StageBackend;
use super::rehydration::RehydrationToken;
use super::types::{
    BackendHealth, ContextResult, Entity, FilterResult, FinalResult, LlmResult,
    SanitizationResult, Stage, StageOutput,
};
use super::wire::{ContextRequest, FilterRequest, FinalRequest, LlmRequest, SanitizeRequest};
use super::BackendError;

/// Failure to inject at a given stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Connection,
    Timeout,
    Status(u16),
    Malformed,
}

impl MockFailure {
    fn to_error(self, stage: Stage) -> BackendError {
        match self {
            MockFailure::Connection => BackendError::Connection("mock://backend".into()),
            MockFailure::Timeout => BackendError::Timeout(Duration::from_secs(10)),
            MockFailure::Status(status) => BackendError::Status {
                status,
                body: format!("{stage} unavailable"),
            },
            MockFailure::Malformed => {
                BackendError::ResponseParsing("expected value at line 1 column 1".into())
            }
        }
    }
}

/// One request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub stage: Stage,
    pub body: Value,
}

pub struct MockBackend {
    sanitization: SanitizationResult,
    sanitize_map: Option<RehydrationToken>,
    context: ContextResult,
    llm: LlmResult,
    llm_map: Option<RehydrationToken>,
    filter: FilterResult,
    filter_map: Option<RehydrationToken>,
    final_result: FinalResult,
    audit: Vec<Value>,
    failures: HashMap<Stage, MockFailure>,
    sanitize_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    /// A backend that answers the email example end to end.
    pub fn new() -> Self {
        Self {
            sanitization: SanitizationResult {
                sanitized: "My email is [EMAIL]".into(),
                risk: 62,
                entities: vec![Entity {
                    entity: "a@b.com".into(),
                    label: "EMAIL".into(),
                    extra: Default::default(),
                }],
                entities_summary: Vec::new(),
                detected_context: Some("personal".into()),
            },
            sanitize_map: RehydrationToken::from_json(r#"{"[EMAIL]":"a@b.com"}"#).ok(),
            context: ContextResult {
                category: Some("personal".into()),
                confidence: Some(73),
                raw_confidence: Some(0.73),
            },
            llm: LlmResult {
                answer: "I can help with messages sent to their email.".into(),
                confidence: 0.82,
                explanations: json!("Placeholders were preserved."),
                fallback_used: false,
                raw: "I can help with messages sent to [EMAIL].".into(),
                provider: Some("mock".into()),
            },
            llm_map: None,
            filter: FilterResult {
                original: String::new(),
                safe_text: "I can help with messages sent to their email.".into(),
                leak_detected: false,
                notes: None,
            },
            filter_map: None,
            final_result: FinalResult {
                text: "I can help with messages sent to a@b.com.".into(),
                risk: Some(12),
            },
            audit: vec![json!({"stage": "sanitize", "entities_count": 1})],
            failures: HashMap::new(),
            sanitize_gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sanitization(mut self, result: SanitizationResult) -> Self {
        self.sanitization = result;
        self
    }

    /// Rehydration map returned by the sanitize stage (raw JSON), or none.
    pub fn with_sanitize_map(mut self, json: Option<&str>) -> Self {
        self.sanitize_map = json.and_then(|j| RehydrationToken::from_json(j).ok());
        self
    }

    pub fn with_context(mut self, result: ContextResult) -> Self {
        self.context = result;
        self
    }

    pub fn with_llm(mut self, result: LlmResult) -> Self {
        self.llm = result;
        self
    }

    /// Rehydration map echoed by the LLM stage (raw JSON), or none.
    pub fn with_llm_map(mut self, json: Option<&str>) -> Self {
        self.llm_map = json.and_then(|j| RehydrationToken::from_json(j).ok());
        self
    }

    pub fn with_filter(mut self, result: FilterResult) -> Self {
        self.filter = result;
        self
    }

    /// Rehydration map returned by the output filter (raw JSON), or none.
    pub fn with_filter_map(mut self, json: Option<&str>) -> Self {
        self.filter_map = json.and_then(|j| RehydrationToken::from_json(j).ok());
        self
    }

    pub fn with_final(mut self, result: FinalResult) -> Self {
        self.final_result = result;
        self
    }

    pub fn with_audit_log(mut self, records: Vec<Value>) -> Self {
        self.audit = records;
        self
    }

    /// Make `stage` fail with `failure`.
    pub fn failing_at(mut self, stage: Stage, failure: MockFailure) -> Self {
        self.failures.insert(stage, failure);
        self
    }

    /// Hold the sanitize stage until `gate` is notified.
    pub fn with_sanitize_gate(mut self, gate: Arc<Notify>) -> Self {
        self.sanitize_gate = Some(gate);
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Request body sent to `stage` in the most recent run, if any.
    pub fn last_body(&self, stage: Stage) -> Option<Value> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| c.stage == stage)
            .map(|c| c.body)
    }

    /// Stages called so far, in order.
    pub fn stages_called(&self) -> Vec<Stage> {
        self.calls().into_iter().map(|c| c.stage).collect()
    }

    fn record<B: Serialize>(&self, stage: Stage, body: &B) -> Result<(), BackendError> {
        let body = serde_json::to_value(body).unwrap_or(Value::Null);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall { stage, body });
        }
        match self.failures.get(&stage) {
            Some(failure) => Err(failure.to_error(stage)),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageBackend for MockBackend {
    async fn sanitize(
        &self,
        input: &str,
    ) -> Result<StageOutput<SanitizationResult>, BackendError> {
        if let Some(gate) = &self.sanitize_gate {
            gate.notified().await;
        }
        self.record(Stage::Sanitize, &SanitizeRequest { input })?;
        Ok(StageOutput {
            result: self.sanitization.clone(),
            rehydration_map: self.sanitize_map.clone(),
        })
    }

    async fn context(&self, input: &str, sanitized: &str) -> Result<ContextResult, BackendError> {
        self.record(Stage::Context, &ContextRequest { input, sanitized })?;
        Ok(self.context.clone())
    }

    async fn llm(&self, request: LlmRequest<'_>) -> Result<StageOutput<LlmResult>, BackendError> {
        self.record(Stage::Llm, &request)?;
        Ok(StageOutput {
            result: self.llm.clone(),
            rehydration_map: self.llm_map.clone(),
        })
    }

    async fn output_filter(
        &self,
        request: FilterRequest<'_>,
    ) -> Result<StageOutput<FilterResult>, BackendError> {
        self.record(Stage::OutputFilter, &request)?;
        let mut result = self.filter.clone();
        result.original = request.answer.to_string();
        Ok(StageOutput {
            result,
            rehydration_map: self.filter_map.clone(),
        })
    }

    async fn finalize(&self, request: FinalRequest<'_>) -> Result<FinalResult, BackendError> {
        self.record(Stage::Final, &request)?;
        Ok(self.final_result.clone())
    }

    async fn health(&self) -> Result<BackendHealth, BackendError> {
        Ok(BackendHealth {
            status: "ok".into(),
        })
    }

    async fn audit_log(&self) -> Result<Vec<Value>, BackendError> {
        Ok(self.audit.clone())
    }

    fn describe(&self) -> String {
        "mock://backend".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sanitize_body() {
        let mock = MockBackend::new();
        let out = mock.sanitize("My email is a@b.com").await.unwrap();
        assert_eq!(out.result.risk, 62);
        assert_eq!(
            mock.last_body(Stage::Sanitize),
            Some(json!({"input": "My email is a@b.com"}))
        );
    }

    #[tokio::test]
    async fn injected_failure_is_returned_after_recording() {
        let mock = MockBackend::new().failing_at(Stage::Context, MockFailure::Status(502));
        let err = mock.context("in", "out").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 502, .. }));
        assert_eq!(mock.stages_called(), vec![Stage::Context]);
    }

    #[tokio::test]
    async fn filter_echoes_submitted_answer_as_original() {
        let mock = MockBackend::new();
        let ctx = ContextResult {
            category: None,
            confidence: None,
            raw_confidence: None,
        };
        let out = mock
            .output_filter(FilterRequest {
                answer: "the answer",
                sanitized: "s",
                context: (&ctx).into(),
                rehydration_map: None,
            })
            .await
            .unwrap();
        assert_eq!(out.result.original, "the answer");
    }

    #[tokio::test]
    async fn health_and_audit() {
        let mock = MockBackend::new().with_audit_log(vec![json!({"stage": "final"})]);
        assert!(mock.health().await.unwrap().is_ok());
        assert_eq!(mock.audit_log().await.unwrap().len(), 1);
    }
}
