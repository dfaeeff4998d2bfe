use vitrine_core::config::ModelConfig;
use vitrine_core::error::{Result, VitrineError};

/// Where a provider's chat-completions endpoint lives and whether it needs a key.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub needs_api_key: bool,
}

fn known_endpoint(provider: &str) -> Option<(&'static str, bool)> {
    match provider {
        "ollama" => Some(("http://localhost:11434/v1/chat/completions", false)),
        "openai" => Some(("https://api.openai.com/v1/chat/completions", true)),
        "groq" => Some(("https://api.groq.com/openai/v1/chat/completions", true)),
        "openrouter" => Some(("https://openrouter.ai/api/v1/chat/completions", true)),
        "together" => Some(("https://api.together.xyz/v1/chat/completions", true)),
        "mistral" => Some(("https://api.mistral.ai/v1/chat/completions", true)),
        "deepseek" => Some(("https://api.deepseek.com/v1/chat/completions", true)),
        _ => None,
    }
}

/// Resolve the endpoint for a model config.
///
/// An explicit `base_url` always wins; unknown providers require one.
pub fn resolve_endpoint(config: &ModelConfig) -> Result<Endpoint> {
    let known = known_endpoint(&config.provider);

    match (&config.base_url, known) {
        (Some(url), known) => Ok(Endpoint {
            url: url.clone(),
            needs_api_key: known.map_or(false, |(_, key)| key),
        }),
        (None, Some((url, needs_api_key))) => Ok(Endpoint {
            url: url.to_string(),
            needs_api_key,
        }),
        (None, None) => Err(VitrineError::Config(format!(
            "provider '{}' has no known endpoint; set model.base_url",
            config.provider
        ))),
    }
}

/// Names of providers with a built-in endpoint.
pub fn known_providers() -> &'static [&'static str] {
    &["ollama", "openai", "groq", "openrouter", "together", "mistral", "deepseek"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_default_endpoint() {
        let config = ModelConfig::default();
        let ep = resolve_endpoint(&config).unwrap();
        assert_eq!(ep.url, "http://localhost:11434/v1/chat/completions");
        assert!(!ep.needs_api_key);
    }

    #[test]
    fn test_base_url_overrides_preset() {
        let config = ModelConfig {
            provider: "openai".into(),
            base_url: Some("http://proxy.internal/v1/chat/completions".into()),
            ..ModelConfig::default()
        };
        let ep = resolve_endpoint(&config).unwrap();
        assert_eq!(ep.url, "http://proxy.internal/v1/chat/completions");
        assert!(ep.needs_api_key);
    }

    #[test]
    fn test_unknown_provider_without_base_url() {
        let config = ModelConfig {
            provider: "vllm".into(),
            ..ModelConfig::default()
        };
        assert!(matches!(
            resolve_endpoint(&config),
            Err(VitrineError::Config(_))
        ));
    }

    #[test]
    fn test_known_providers_all_resolve() {
        for name in known_providers() {
            let config = ModelConfig {
                provider: name.to_string(),
                ..ModelConfig::default()
            };
            assert!(resolve_endpoint(&config).is_ok(), "{name}");
        }
    }
}
