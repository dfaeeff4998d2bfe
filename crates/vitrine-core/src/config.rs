use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VitrineError};

/// Top-level Vitrine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            extra_headers: HashMap::new(),
        }
    }
}

fn default_provider() -> String { "ollama".to_string() }
fn default_model_id() -> String { "qwen2.5:3b".to_string() }
fn default_max_tokens() -> u32 { 1024 }
fn default_temperature() -> f32 { 0.0 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database path. `~/` is expanded.
    #[serde(default = "default_database")]
    pub database: String,
    /// Load the bundled fixture into an empty catalog at startup.
    #[serde(default)]
    pub seed_on_start: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            seed_on_start: false,
        }
    }
}

fn default_database() -> String { "~/.vitrine/catalog.db".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Override for the bundled intention prompt template.
    #[serde(default)]
    pub prompt_path: Option<String>,
    /// Deadline for the classification call. 0 disables it.
    #[serde(default = "default_classification_timeout")]
    pub classification_timeout_secs: u64,
    /// Upper price bound for the `budget` price filter.
    #[serde(default = "default_budget_ceiling")]
    pub budget_price_ceiling: f64,
    /// Lower price bound for the `premium` price filter.
    #[serde(default = "default_premium_floor")]
    pub premium_price_floor: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            prompt_path: None,
            classification_timeout_secs: default_classification_timeout(),
            budget_price_ceiling: default_budget_ceiling(),
            premium_price_floor: default_premium_floor(),
        }
    }
}

fn default_classification_timeout() -> u64 { 60 }
fn default_budget_ceiling() -> f64 { 100.0 }
fn default_premium_floor() -> f64 { 200.0 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String { "127.0.0.1:18790".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| VitrineError::ConfigNotFound(path.display().to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse config from TOML text, with env var expansion.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| VitrineError::Config(e.to_string()))
    }

    /// Local Ollama model with a self-seeding catalog. Used when no config
    /// file exists.
    pub fn default_for_ollama() -> Self {
        let mut config = Self::default();
        config.catalog.seed_on_start = true;
        config
    }

    /// Resolve the catalog database path (expand ~).
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.catalog.database)
    }

    /// Resolve the prompt override path, if any (expand ~).
    pub fn prompt_path(&self) -> Option<PathBuf> {
        self.workflow.prompt_path.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    tracing::warn!(var = %var_name, "Config references an unset environment variable");
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
