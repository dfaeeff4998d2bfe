use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use vitrine_agent::IntentionWorkflow;
use vitrine_core::config::GatewayConfig;

use crate::routes;
use crate::state::AppState;

/// Build the HTTP routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(routes::chat))
        .route("/chat/tags", get(routes::tags))
        .route("/api/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP gateway in front of the intention workflow.
pub struct GatewayServer {
    config: GatewayConfig,
    workflow: Arc<IntentionWorkflow>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, workflow: Arc<IntentionWorkflow>) -> Self {
        Self { config, workflow }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = router(Arc::new(AppState {
            config: self.config.clone(),
            workflow: self.workflow.clone(),
        }));

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use vitrine_agent::PromptTemplate;
    use vitrine_test_utils::{
        classification_json, sample_products, seeded_catalog, test_model_config, ScriptedLlm,
    };

    fn app(llm: ScriptedLlm) -> Router {
        let workflow = IntentionWorkflow::new(
            Arc::new(llm),
            Arc::new(seeded_catalog(&sample_products())),
            test_model_config(),
            PromptTemplate::bundled().unwrap(),
        );
        router(Arc::new(AppState {
            config: GatewayConfig::default(),
            workflow: Arc::new(workflow),
        }))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_chat(message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "message": message }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ScriptedLlm::text("{}"))
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_returns_combo_reply() {
        let llm = ScriptedLlm::text(classification_json(json!({
            "kind": "combo",
            "product_types": ["Keyboard"],
            "price_filter": "cheapest",
        })));
        let response = app(llm).oneshot(post_chat("cheapest keyboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["type"], "combo");
        assert_eq!(body["report"]["products"][0]["name"], "SteelSeries Apex 3");
        assert_eq!(body["report"]["total_price"], 49.99);
    }

    #[tokio::test]
    async fn test_chat_unclassified_is_still_ok() {
        let response = app(ScriptedLlm::text("no idea"))
            .oneshot(post_chat("hello?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["type"], "unclassified");
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let llm = ScriptedLlm::text("{}");
        let seen = llm.requests();
        let response = app(llm).oneshot(post_chat("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tags_sorted() {
        let response = app(ScriptedLlm::text("{}"))
            .oneshot(Request::get("/chat/tags").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let tags: Vec<&str> = body["available_tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t.as_str().unwrap())
            .collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
        assert!(tags.contains(&"Gaming"));
    }
}
