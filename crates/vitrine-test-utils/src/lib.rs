//! Mocks and fixtures shared by vitrine tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;

use vitrine_catalog::{NewProduct, SqliteCatalog};
use vitrine_core::config::ModelConfig;
use vitrine_core::error::{Result, VitrineError};
use vitrine_core::traits::LlmClient;
use vitrine_core::types::{ChatMessage, StopReason, StreamDelta};

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Error(String),
}

/// LLM client that replays canned replies and records every request.
///
/// Replies are consumed in order; the last one repeats once the script
/// runs out.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedLlm {
    fn from_script(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer with `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_script(vec![Scripted::Text(text.into())])
    }

    /// Answer with each text in turn.
    pub fn sequence<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_script(texts.into_iter().map(|t| Scripted::Text(t.into())).collect())
    }

    /// Fail every request with `LlmRequest(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_script(vec![Scripted::Error(message.into())])
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle to the recorded requests. Stays valid after the client is
    /// moved into an `Arc<dyn LlmClient>`.
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<ChatMessage>>>> {
        Arc::clone(&self.requests)
    }

    fn next_reply(&self) -> Scripted {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = script.pop_front() {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Scripted::Error("script is empty".into()))
    }
}

impl LlmClient for ScriptedLlm {
    fn chat_stream(
        &self,
        _config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        self.requests.lock().unwrap().push(messages);
        let reply = self.next_reply();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Scripted::Text(text) => {
                    let deltas = vec![
                        Ok(StreamDelta::TextDelta(text)),
                        Ok(StreamDelta::Stop(StopReason::EndTurn)),
                    ];
                    Ok(stream::iter(deltas).boxed())
                }
                Scripted::Error(message) => Err(VitrineError::LlmRequest(message)),
            }
        })
    }
}

/// A classifier reply wrapping `intention`.
pub fn classification_json(intention: Value) -> String {
    json!({ "intention": intention }).to_string()
}

pub fn test_model_config() -> ModelConfig {
    ModelConfig {
        provider: "ollama".into(),
        model_id: "test-model".into(),
        base_url: Some("http://127.0.0.1:9/v1/chat/completions".into()),
        max_tokens: 256,
        temperature: 0.0,
        ..ModelConfig::default()
    }
}

/// A small peripheral catalog: three keyboards at 49.99, 89.99 and
/// 229.99, two mice, a headset, and one out-of-stock keyboard.
pub fn sample_products() -> Vec<NewProduct> {
    vec![
        NewProduct::new("Logitech G Pro X Superlight", "Mouse", "Logitech", 149.99)
            .with_stock(50, 10)
            .with_tags(&["Logitech", "Gaming", "Wireless", "Lightweight"]),
        NewProduct::new("Razer Viper Mini", "Mouse", "Razer", 39.99)
            .with_stock(4, 20)
            .with_tags(&["Razer", "Gaming", "Budget"]),
        NewProduct::new("Razer BlackWidow V3 Pro", "Keyboard", "Razer", 229.99)
            .with_stock(35, 8)
            .with_tags(&["Razer", "Gaming", "Wireless", "Mechanical"]),
        NewProduct::new("HyperX Alloy Origins", "Keyboard", "HyperX", 89.99)
            .with_stock(55, 12)
            .with_tags(&["HyperX", "Gaming", "Compact"]),
        NewProduct::new("SteelSeries Apex 3", "Keyboard", "SteelSeries", 49.99)
            .with_stock(90, 20)
            .with_tags(&["SteelSeries", "Gaming", "Budget", "Silent"]),
        NewProduct::new("Corsair K55 RGB", "Keyboard", "Corsair", 39.99)
            .with_stock(0, 10)
            .with_tags(&["Corsair", "Gaming", "RGB", "Budget"]),
        NewProduct::new("HyperX Cloud Alpha", "Headset", "HyperX", 99.99)
            .with_stock(65, 15)
            .with_tags(&["HyperX", "Gaming", "Durable"]),
    ]
}

/// In-memory catalog holding `products`.
pub fn seeded_catalog(products: &[NewProduct]) -> SqliteCatalog {
    let catalog = SqliteCatalog::in_memory().unwrap();
    catalog.insert_products(products).unwrap();
    catalog
}

/// Write `content` to `vitrine.toml` in a fresh temp dir.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vitrine.toml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
