//! Full runs through `CoreState` → `PipelineOrchestrator` → `HttpBackend`
//! against a wiremock backend.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use redactlens_lib::config::DashboardConfig;
use redactlens_lib::core_state::CoreState;
use redactlens_lib::dashboard::{build_view, Panel};
use redactlens_lib::pipeline::risk::RiskBand;
use redactlens_lib::pipeline::{RunOutcome, RunPhase, Stage};

/// Map exactly as the backend writes it, odd spacing and number text included.
const MAP_TEXT: &str = r#"{"[EMAIL]": "a@b.com",  "score": 2.50}"#;

fn core_for(server: &MockServer) -> Arc<CoreState> {
    let config = DashboardConfig::default()
        .with_backend_url(&server.uri())
        .unwrap();
    Arc::new(CoreState::new(config).unwrap())
}

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_sanitize(server: &MockServer) {
    let body = format!(
        r#"{{"sanitized":"My email is [EMAIL]","risk":62,"rehydration_map":{MAP_TEXT},"entities":[{{"entity":"a@b.com","label":"EMAIL"}}]}}"#
    );
    Mock::given(method("POST"))
        .and(path("/api/sanitize"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(server)
        .await;
}

async fn mount_happy_backend(server: &MockServer) {
    mount_sanitize(server).await;
    mount_json(
        server,
        "/api/context",
        json!({"category": "personal", "confidence": 0.73}),
    )
    .await;
    mount_json(
        server,
        "/api/llm",
        json!({
            "answer": "I can reach you at [EMAIL].",
            "confidence": 0.8,
            "explanations": "Placeholders preserved.",
            "fallback_used": false,
            "raw": "I can reach you at [EMAIL]."
        }),
    )
    .await;
    mount_json(
        server,
        "/api/output-filter",
        json!({
            "safe_sanitized_text": "I can reach you at [EMAIL].",
            "leak_detected": false,
            "notes": ""
        }),
    )
    .await;
    mount_json(
        server,
        "/api/final",
        json!({"final_rehydrated_text": "I can reach you at a@b.com."}),
    )
    .await;
}

/// Raw request bodies received for `route`, in arrival order.
async fn bodies_for(server: &MockServer, route: &str) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == route)
        .map(|r| String::from_utf8(r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn email_prompt_end_to_end() {
    let server = MockServer::start().await;
    mount_happy_backend(&server).await;
    let core = core_for(&server);

    let outcome = core.orchestrator().run("My email is a@b.com").await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)), "{outcome:?}");

    let state = core.dashboard().unwrap();
    assert_eq!(state.risk, 62);
    assert_eq!(RiskBand::from_score(state.risk).color(), "yellow");
    assert_eq!(state.phase, RunPhase::Done);
    assert_eq!(state.log.len(), 1);
    let entry = state.log.latest().unwrap();
    assert_eq!((entry.text.as_str(), entry.score), ("My email is [EMAIL]", 62));

    // Final stage sent no score: the final panel falls back to 62.
    let view = build_view(&state);
    let final_view = view.final_output.ready().unwrap();
    assert_eq!(final_view.text, "I can reach you at a@b.com.");
    assert_eq!(final_view.risk.score, 62);
    assert_eq!(view.context.ready().unwrap().confidence, "73%");
}

#[tokio::test]
async fn rehydration_map_bytes_reach_later_stages_unchanged() {
    let server = MockServer::start().await;
    mount_happy_backend(&server).await;
    let core = core_for(&server);

    core.orchestrator().run("My email is a@b.com").await.unwrap();

    let expected = format!(r#""rehydration_map":{MAP_TEXT}"#);
    for route in ["/api/llm", "/api/output-filter", "/api/final"] {
        let bodies = bodies_for(&server, route).await;
        assert_eq!(bodies.len(), 1, "{route}");
        assert!(bodies[0].contains(&expected), "{route}: {}", bodies[0]);
    }
    // Never sent to the first two stages.
    for route in ["/api/sanitize", "/api/context"] {
        let bodies = bodies_for(&server, route).await;
        assert!(!bodies[0].contains("rehydration_map"), "{route}");
    }
}

#[tokio::test]
async fn context_failure_keeps_sanitize_results() {
    let server = MockServer::start().await;
    mount_sanitize(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/context"))
        .respond_with(ResponseTemplate::new(503).set_body_string("context model offline"))
        .mount(&server)
        .await;
    let core = core_for(&server);

    let outcome = core.orchestrator().run("My email is a@b.com").await.unwrap();
    let failure = match outcome {
        RunOutcome::Failed(failure) => failure,
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(failure.stage, Stage::Context);
    assert_eq!(failure.status, Some(503));

    let state = core.dashboard().unwrap();
    assert!(!state.loading);
    assert_eq!(state.log.len(), 1);
    let view = build_view(&state);
    assert!(view.sanitized.ready().is_some());
    assert!(matches!(view.context, Panel::Empty { .. }));
    assert!(matches!(view.llm, Panel::Empty { .. }));
    assert!(matches!(view.filter, Panel::Empty { .. }));
    assert!(matches!(view.final_output, Panel::Empty { .. }));
    assert_eq!(view.error.unwrap().stage, Stage::Context);

    assert!(bodies_for(&server, "/api/llm").await.is_empty());
}

#[tokio::test]
async fn blank_prompt_never_reaches_backend() {
    let server = MockServer::start().await;
    mount_happy_backend(&server).await;
    let core = core_for(&server);

    let outcome = core.orchestrator().run(" \n ").await.unwrap();
    assert!(matches!(outcome, RunOutcome::Skipped(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
