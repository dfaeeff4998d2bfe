use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info};

use vitrine_agent::ChatReply;
use vitrine_core::traits::Catalog;

use crate::state::AppState;

/// Error body returned as `{"error": "..."}`.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
pub struct ChatBody {
    pub message: String,
}

// POST /chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "message is empty".into()));
    }

    info!(chars = message.len(), "Chat request");
    match state.workflow.respond(message).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            error!(error = %e, "Chat workflow failed");
            Err(ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// GET /chat/tags
pub async fn tags(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let tags = state
        .workflow
        .catalog()
        .all_tags()
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(serde_json::json!({ "available_tags": tags })))
}
