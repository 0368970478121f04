// src/api/mod.rs — HTTP front end for the assistant

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::core::assistant::Assistant;
use crate::infra::config::ServerConfig;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
}

impl ApiState {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self { assistant }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState, config: &ServerConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = build_router(state, config);

    tracing::info!("API server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::orchestrator::ConversationOrchestrator;
    use crate::core::prompts::ROUTER_PROMPT;
    use crate::infra::config::Config;
    use crate::infra::errors::FrontdeskError;
    use crate::knowledge::KnowledgeBase;
    use crate::provider::tiers::{ModelClient, ModelTiers};
    use crate::provider::{ChatRequest, ChatResponse, ModelProvider, ModelRef};
    use crate::session::MemorySessionStore;
    use crate::tools::{ToolExecutor, ToolRegistry};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Routes everything to FAQ and answers with a fixed line.
    struct CannedProvider;

    #[async_trait]
    impl ModelProvider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, FrontdeskError> {
            if request.system.as_deref() == Some(ROUTER_PROMPT) {
                Ok(ChatResponse::text("FAQ"))
            } else {
                Ok(ChatResponse::text("We open at 9am."))
            }
        }
    }

    fn test_state() -> ApiState {
        let config = Config::default();
        let provider: Arc<dyn ModelProvider> = Arc::new(CannedProvider);
        let tiers = ModelTiers::new(
            ModelClient::new(provider.clone(), ModelRef::new("canned", "cheap")),
            ModelClient::new(provider, ModelRef::new("canned", "capable")),
        );
        let orchestrator = ConversationOrchestrator::new(
            tiers,
            Arc::new(ToolExecutor::new(ToolRegistry::new())),
            Arc::new(KnowledgeBase::from_markdown("", 3)),
            &config,
        );
        let assistant = Assistant::new(
            Arc::new(orchestrator),
            Arc::new(MemorySessionStore::new()),
            &config.conversation,
        );
        ApiState::new(Arc::new(assistant))
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state(), &ServerConfig::default());
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_returns_reply() {
        let app = build_router(test_state(), &ServerConfig::default());
        let resp = app
            .oneshot(chat_request(
                r#"{"session_id":"s1","message":"When do you open?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: types::ChatResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.session_id, "s1");
        assert_eq!(body.reply, "We open at 9am.");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let app = build_router(test_state(), &ServerConfig::default());
        let resp = app
            .oneshot(chat_request(r#"{"session_id":"s1","message":"   "}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_session_id() {
        let app = build_router(test_state(), &ServerConfig::default());
        let resp = app
            .oneshot(chat_request(r#"{"session_id":"","message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
