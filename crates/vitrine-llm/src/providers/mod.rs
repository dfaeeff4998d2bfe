pub mod endpoint;
pub mod openai;

pub use endpoint::{known_providers, resolve_endpoint, Endpoint};
pub use openai::OpenAiClient;
