use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::backend::StageBackend;
use super::types::{
    BackendHealth, ContextResult, FilterResult, FinalResult, LlmResult, SanitizationResult, Stage,
    StageOutput,
};
use super::wire::{
    ContextRequest, ContextResponse, FilterRequest, FilterResponse, FinalRequest, FinalResponse,
    LlmRequest, LlmResponse, SanitizeRequest, SanitizeResponse,
};
use super::BackendError;
use crate::pipeline_config::StageTimeouts;

/// Connect timeout shared by every request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for the health and audit-log probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Error bodies are cut to this many characters before they reach logs.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP client for the sanitization backend.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeouts: StageTimeouts,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str, timeouts: StageTimeouts) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeouts,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> &StageTimeouts {
        &self.timeouts
    }

    async fn post_stage<B, R>(&self, stage: Stage, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, stage.endpoint());
        let timeout = self.timeouts.for_stage(stage);
        let started = Instant::now();

        let request = self.client.post(&url).timeout(timeout).json(body);
        let parsed = self.execute(request, timeout).await?;

        tracing::debug!(
            stage = %stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend stage responded"
        );
        Ok(parsed)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.get(&url).timeout(PROBE_TIMEOUT);
        self.execute(request, PROBE_TIMEOUT).await
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<R, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        response.json::<R>().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(timeout)
            } else {
                BackendError::ResponseParsing(e.to_string())
            }
        })
    }

    fn classify(&self, error: reqwest::Error, timeout: Duration) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout(timeout)
        } else if error.is_connect() {
            BackendError::Connection(self.base_url.clone())
        } else {
            BackendError::HttpClient(error.to_string())
        }
    }
}

#[async_trait]
impl StageBackend for HttpBackend {
    async fn sanitize(
        &self,
        input: &str,
    ) -> Result<StageOutput<SanitizationResult>, BackendError> {
        let response: SanitizeResponse = self
            .post_stage(Stage::Sanitize, &SanitizeRequest { input })
            .await?;
        Ok(response.into_output())
    }

    async fn context(&self, input: &str, sanitized: &str) -> Result<ContextResult, BackendError> {
        let response: ContextResponse = self
            .post_stage(Stage::Context, &ContextRequest { input, sanitized })
            .await?;
        Ok(response.into_result())
    }

    async fn llm(&self, request: LlmRequest<'_>) -> Result<StageOutput<LlmResult>, BackendError> {
        let response: LlmResponse = self.post_stage(Stage::Llm, &request).await?;
        Ok(response.into_output())
    }

    async fn output_filter(
        &self,
        request: FilterRequest<'_>,
    ) -> Result<StageOutput<FilterResult>, BackendError> {
        let response: FilterResponse = self.post_stage(Stage::OutputFilter, &request).await?;
        Ok(response.into_output(request.answer))
    }

    async fn finalize(&self, request: FinalRequest<'_>) -> Result<FinalResult, BackendError> {
        let response: FinalResponse = self.post_stage(Stage::Final, &request).await?;
        Ok(response.into_result())
    }

    async fn health(&self) -> Result<BackendHealth, BackendError> {
        self.get_json("/health").await
    }

    async fn audit_log(&self) -> Result<Vec<Value>, BackendError> {
        self.get_json("/api/logs").await
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
