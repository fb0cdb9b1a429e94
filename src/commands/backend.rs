//! Backend probes: `redactlens health` and `redactlens backend-logs`.

use serde::Serialize;
use serde_json::Value;

use crate::core_state::CoreState;

#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub backend_url: String,
    pub reachable: bool,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl BackendStatus {
    pub fn is_healthy(&self) -> bool {
        self.reachable && self.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("ok"))
    }
}

/// Probe the backend's `/health`. Unreachable is a status, not an error.
pub async fn check_backend(state: &CoreState) -> BackendStatus {
    let backend = state.backend();
    let backend_url = backend.describe();
    match backend.health().await {
        Ok(health) => BackendStatus {
            backend_url,
            reachable: true,
            status: Some(health.status),
            error: None,
        },
        Err(e) => {
            tracing::warn!(backend = %backend_url, error = %e, "Backend health probe failed");
            BackendStatus {
                backend_url,
                reachable: false,
                status: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// The backend audit log, newest first, cut to `limit` records.
pub async fn fetch_backend_logs(
    state: &CoreState,
    limit: Option<usize>,
) -> Result<Vec<Value>, String> {
    let mut records = state
        .backend()
        .audit_log()
        .await
        .map_err(|e| format!("Failed to fetch backend logs: {e}"))?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    Ok(records)
}

/// One compact JSON line per record.
pub fn format_records(records: &[Value]) -> String {
    if records.is_empty() {
        return "No backend log records.\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::config::DashboardConfig;
    use crate::pipeline::mock::MockBackend;

    #[tokio::test]
    async fn healthy_mock_backend() {
        let state = CoreState::with_backend(DashboardConfig::default(), Arc::new(MockBackend::new()));
        let status = check_backend(&state).await;
        assert!(status.is_healthy());
        assert_eq!(status.backend_url, "mock://backend");
    }

    #[tokio::test]
    async fn unreachable_backend_is_reported() {
        let config = DashboardConfig::default()
            .with_backend_url("http://127.0.0.1:1")
            .unwrap();
        let state = CoreState::new(config).unwrap();
        let status = check_backend(&state).await;
        assert!(!status.reachable);
        assert!(!status.is_healthy());
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn logs_are_limited() {
        let mock = MockBackend::new().with_audit_log(vec![json!({"n": 1}), json!({"n": 2})]);
        let state = CoreState::with_backend(DashboardConfig::default(), Arc::new(mock));
        let records = fetch_backend_logs(&state, Some(1)).await.unwrap();
        assert_eq!(records, vec![json!({"n": 1})]);
    }

    #[test]
    fn formats_one_line_per_record() {
        assert_eq!(format_records(&[]), "No backend log records.\n");
        let text = format_records(&[json!({"stage": "final"}), json!({"stage": "llm"})]);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"stage":"final"}"#));
    }
}
