//! HTTP surface of the review backend.
//!
//! - `POST /events`: trigger events (`repository.connected`, `pr.review.requested`)
//! - `GET  /health`: liveness check

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use std::env;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::core::app_state::AppState;
use crate::error_handler::AppError;
use crate::middleware_layer::json_extractor::json_error_mapper;
use crate::routes::{events::event_route::event_route, health_route::health};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(event_route))
        .route("/health", get(health))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Serves the router on `API_ADDRESS` until Ctrl+C.
pub async fn start(state: AppState) -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").map_err(|_| AppError::MissingEnv("API_ADDRESS"))?;
    if state.trigger_secret.trim().is_empty() {
        warn!("TRIGGER_SECRET is not set, every event request will be rejected");
    }

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "api listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ai_llm_service::{LlmModelConfig, LlmProvider, LlmServiceProfiles};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use git_context_engine::{ProviderClient, ProviderConfig, ProviderKind};
    use pr_reviewer::{
        MemoryJournal, MemoryStore, ReviewEngine, ReviewerConfig, RetryPolicy, WorkflowDeps,
        WorkflowScheduler,
    };
    use rag_store::{InMemoryIndex, RagConfig, RagStore};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn llm() -> Arc<LlmServiceProfiles> {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "m".into(),
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        };
        Arc::new(LlmServiceProfiles::new(cfg.clone(), cfg))
    }

    /// Nobody has credentials, so spawned workflows fail before any network call.
    fn app() -> Router {
        let llm = llm();
        let store = Arc::new(MemoryStore::new());
        let host = ProviderClient::from_config(ProviderConfig {
            kind: ProviderKind::GitHub,
            base_api: "http://127.0.0.1:9".into(),
        })
        .unwrap();
        let deps = WorkflowDeps {
            host: Arc::new(host),
            provider: ProviderKind::GitHub,
            rag: Arc::new(RagStore::with_index(
                RagConfig::in_memory(),
                llm.clone(),
                Arc::new(InMemoryIndex::new()),
            )),
            engine: ReviewEngine::new(llm),
            credentials: store.clone(),
            reviews: store,
            journal: Arc::new(MemoryJournal::new()),
            retry: RetryPolicy::new(1, Duration::from_millis(1)),
            web_base: "https://github.com".into(),
        };
        let scheduler = WorkflowScheduler::new(deps, &ReviewerConfig::default());
        router(AppState::new("s3cret", scheduler))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_event(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/events")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "data": {"status": "ok"}}));
    }

    #[tokio::test]
    async fn review_event_is_accepted_with_instance_id() {
        let (status, body) = call(
            app(),
            post_event(json!({
                "name": "pr.review.requested",
                "data": {"owner": "acme", "repo": "widgets", "prNumber": 42, "userId": "u1"},
                "id": "evt-9",
                "secret": "s3cret"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["instance_id"], json!("evt-9"));
        assert_eq!(body["data"]["event"], json!("pr.review.requested"));
    }

    #[tokio::test]
    async fn reused_id_with_another_payload_conflicts() {
        let app = app();
        let event = |pr: u64| {
            post_event(json!({
                "name": "pr.review.requested",
                "data": {"owner": "acme", "repo": "widgets", "prNumber": pr, "userId": "u1"},
                "id": "evt-9",
                "secret": "s3cret"
            }))
        };

        let (first, _) = call(app.clone(), event(1)).await;
        let (status, body) = call(app, event(2)).await;

        assert_eq!(first, StatusCode::ACCEPTED);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], json!("INSTANCE_CONFLICT"));
        assert_eq!(body["error"]["details"][0]["path"], json!("id"));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let (status, body) = call(
            app(),
            post_event(json!({
                "name": "repository.connected",
                "data": {"owner": "acme", "repo": "widgets", "userId": "u1"},
                "secret": "nope"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));
        assert_eq!(body["error"]["details"][0]["path"], json!("secret"));
    }

    #[tokio::test]
    async fn unknown_event_is_a_bad_request() {
        let (status, body) = call(
            app(),
            post_event(json!({"name": "pr.closed", "data": {}, "secret": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
    }

    #[tokio::test]
    async fn malformed_body_is_wrapped_in_envelope() {
        let (status, body) = call(app(), post_event(json!({"name": "pr.review.requested"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("UNPROCESSABLE_ENTITY"));
        assert_eq!(body["error"]["details"][0]["path"], json!("secret"));
    }
}
