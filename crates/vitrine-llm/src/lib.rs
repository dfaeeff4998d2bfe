pub mod providers;
pub mod streaming;

use vitrine_core::config::ModelConfig;
use vitrine_core::error::Result;
use vitrine_core::traits::LlmClient;

pub use providers::{resolve_endpoint, Endpoint, OpenAiClient};

/// Create an LLM client for the configured provider.
///
/// Every supported provider speaks the OpenAI chat-completions protocol,
/// so this only validates that the provider's endpoint can be resolved.
pub fn create_client(config: &ModelConfig) -> Result<Box<dyn LlmClient>> {
    resolve_endpoint(config)?;
    Ok(Box::new(OpenAiClient::new()))
}
