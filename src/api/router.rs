//! Dashboard API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Layers (outermost → innermost): CORS → access log → handler.

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the dashboard API router.
pub fn dashboard_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // The browser page is served from another origin (dev server).
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/run", post(endpoints::run::start))
        .route("/dashboard", get(endpoints::dashboard::view))
        .route("/logs", get(endpoints::logs::list))
        .route("/backend/logs", get(endpoints::logs::backend))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(cors)
}

async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use crate::config::DashboardConfig;
    use crate::pipeline::mock::{MockBackend, MockFailure};
    use crate::pipeline::Stage;

    fn core_with(mock: MockBackend) -> Arc<CoreState> {
        Arc::new(CoreState::with_backend(
            DashboardConfig::default(),
            Arc::new(mock),
        ))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 65536)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn wait_until_idle(core: &CoreState) {
        for _ in 0..200 {
            if !core.is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("run did not finish");
    }

    #[tokio::test]
    async fn health_response_shape() {
        let app = dashboard_router(core_with(MockBackend::new()));
        let response = app.oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["backend_url"], "mock://backend");
        assert_eq!(json["running"], false);
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn run_is_accepted_and_dashboard_fills_in() {
        let core = core_with(MockBackend::new());
        let app = dashboard_router(core.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/run", r#"{"input":"My email is a@b.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = response_json(response).await;
        assert_eq!(json["status"], "started");
        let run_id = json["run_id"].as_str().unwrap().to_string();

        wait_until_idle(&core).await;

        let response = app.oneshot(get_req("/api/dashboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["run_id"], run_id.as_str());
        assert_eq!(json["phase"]["phase"], "done");
        assert_eq!(json["risk_meter"]["score"], 62);
        assert_eq!(json["risk_meter"]["color"], "yellow");
        assert_eq!(json["sanitized"]["data"]["text"], "My email is [EMAIL]");
        assert_eq!(json["context"]["data"]["confidence"], "73%");
        assert_eq!(json["final"]["data"]["risk"]["score"], 12);
        assert_eq!(json["logs"]["data"][0]["risk"]["score"], 62);
        assert!(json["error"].is_null());
    }

    #[tokio::test]
    async fn blank_input_is_skipped() {
        let app = dashboard_router(core_with(MockBackend::new()));
        let response = app
            .oneshot(post_json("/api/run", r#"{"input":"   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "empty_input");
        assert!(json.get("run_id").is_none());
    }

    #[tokio::test]
    async fn missing_input_field_is_bad_request() {
        let app = dashboard_router(core_with(MockBackend::new()));
        let response = app
            .oneshot(post_json("/api/run", r#"{"prompt":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn second_run_while_busy_is_conflict() {
        let gate = Arc::new(Notify::new());
        let core = core_with(MockBackend::new().with_sanitize_gate(gate.clone()));
        let app = dashboard_router(core.clone());

        let first = app
            .clone()
            .oneshot(post_json("/api/run", r#"{"input":"first"}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app
            .clone()
            .oneshot(post_json("/api/run", r#"{"input":"second"}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let json = response_json(second).await;
        assert_eq!(json["error"]["code"], "RUN_IN_PROGRESS");

        let busy = app.clone().oneshot(get_req("/api/dashboard")).await.unwrap();
        let json = response_json(busy).await;
        assert_eq!(json["loading"], true);
        assert_eq!(json["sanitized"]["status"], "loading");

        gate.notify_one();
        wait_until_idle(&core).await;
    }

    #[tokio::test]
    async fn failed_run_shows_error_banner() {
        let core = core_with(MockBackend::new().failing_at(Stage::Llm, MockFailure::Timeout));
        let app = dashboard_router(core.clone());

        app.clone()
            .oneshot(post_json("/api/run", r#"{"input":"hello"}"#))
            .await
            .unwrap();
        wait_until_idle(&core).await;

        let response = app.oneshot(get_req("/api/dashboard")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["error"]["stage"], "llm");
        assert_eq!(json["context"]["status"], "ready");
        assert_eq!(json["llm"]["status"], "empty");
        assert_eq!(json["phase"], serde_json::json!({"phase": "failed", "stage": "llm"}));
    }

    #[tokio::test]
    async fn logs_list_most_recent_first() {
        let core = core_with(MockBackend::new());
        core.orchestrator().run("one").await.unwrap();
        core.orchestrator().run("two").await.unwrap();
        let latest = core.dashboard().unwrap().run_id.unwrap();

        let app = dashboard_router(core);
        let response = app.oneshot(get_req("/api/logs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["capacity"], 20);
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);
        assert_eq!(json["entries"][0]["run_id"], latest.to_string());
        assert_eq!(json["entries"][0]["text"], "My email is [EMAIL]");
    }

    #[tokio::test]
    async fn backend_logs_are_proxied_with_limit() {
        let mock = MockBackend::new().with_audit_log(vec![
            serde_json::json!({"stage": "final"}),
            serde_json::json!({"stage": "sanitize"}),
        ]);
        let app = dashboard_router(core_with(mock));
        let response = app
            .oneshot(get_req("/api/backend/logs?limit=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["records"], serde_json::json!([{"stage": "final"}]));
    }

    #[tokio::test]
    async fn unreachable_backend_logs_are_502() {
        let config = DashboardConfig::default()
            .with_backend_url("http://127.0.0.1:1")
            .unwrap();
        let core = Arc::new(CoreState::new(config).unwrap());
        let app = dashboard_router(core);
        let response = app.oneshot(get_req("/api/backend/logs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BACKEND_UNAVAILABLE");
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let app = dashboard_router(core_with(MockBackend::new()));
        let response = app.oneshot(get_req("/api/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = dashboard_router(core_with(MockBackend::new()));
        let req = Request::builder()
            .uri("/api/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
