use std::sync::Arc;

use vitrine_agent::IntentionWorkflow;
use vitrine_core::config::GatewayConfig;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub workflow: Arc<IntentionWorkflow>,
}
