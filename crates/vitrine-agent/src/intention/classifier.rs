use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use vitrine_core::config::ModelConfig;
use vitrine_core::error::{Result, VitrineError};
use vitrine_core::traits::LlmClient;
use vitrine_core::types::{ChatMessage, StopReason, StreamDelta};

use super::models::{ClassificationResult, Intention, WorkflowOutput};
use crate::graph::{ResolvedParams, Task};
use crate::prompt::PromptTemplate;

/// Root task of the intention workflow.
///
/// Renders the `system` and `user` prompt sections from its parameters,
/// sends them to the model and parses the reply into a
/// [`ClassificationResult`]. No retries.
pub struct ClassificationTask {
    llm: Arc<dyn LlmClient>,
    model: ModelConfig,
    prompt: Arc<PromptTemplate>,
    timeout: Option<Duration>,
}

impl ClassificationTask {
    pub fn new(llm: Arc<dyn LlmClient>, model: ModelConfig, prompt: Arc<PromptTemplate>) -> Self {
        Self {
            llm,
            model,
            prompt,
            timeout: None,
        }
    }

    /// Deadline for the model round trip. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify with the given prompt variables.
    pub async fn classify(&self, vars: &Value) -> Result<ClassificationResult> {
        let rendered = self.prompt.render(&[("system", vars), ("user", vars)])?;
        let [system, user]: [String; 2] = rendered
            .try_into()
            .map_err(|_| VitrineError::Template("expected two rendered sections".into()))?;
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];

        let text = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.complete(messages))
                .await
                .map_err(|_| VitrineError::Timeout(limit.as_millis() as u64))??,
            None => self.complete(messages).await?,
        };

        let result = parse_classification(&text)?;
        info!(intention = result.intention.kind().as_str(), "Classified message");
        Ok(result)
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let mut stream = self.llm.chat_stream(&self.model, messages).await?;
        let mut text = String::new();

        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::TextDelta(chunk) => text.push_str(&chunk),
                StreamDelta::Stop(StopReason::MaxTokens) => {
                    warn!(max_tokens = self.model.max_tokens, "Classifier output truncated");
                }
                StreamDelta::Stop(_) => {}
                StreamDelta::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    debug!(input_tokens, output_tokens, "Classifier usage");
                }
            }
        }

        Ok(text)
    }
}

impl Task<WorkflowOutput> for ClassificationTask {
    fn name(&self) -> &str {
        "classify_intention"
    }

    fn run(&self, params: ResolvedParams) -> BoxFuture<'_, Result<WorkflowOutput>> {
        Box::pin(async move {
            let vars = params.to_object();
            self.classify(&vars)
                .await
                .map(WorkflowOutput::Classification)
        })
    }
}

/// Parse the model's reply.
///
/// Accepts the documented `{"intention": {...}}` shape, optionally wrapped in
/// a markdown code fence, and also a bare intention object, which small
/// models tend to emit.
pub fn parse_classification(text: &str) -> Result<ClassificationResult> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(VitrineError::Classification("empty model response".into()));
    }

    let result = match serde_json::from_str::<ClassificationResult>(&body) {
        Ok(result) => result,
        Err(wrapped_err) => match serde_json::from_str::<Intention>(&body) {
            Ok(intention) => ClassificationResult { intention },
            Err(_) => {
                return Err(VitrineError::Classification(format!(
                    "non-conforming model output: {}",
                    wrapped_err
                )))
            }
        },
    };

    if let Intention::Info(info) = &result.intention {
        if info.product_names.is_empty() {
            return Err(VitrineError::Classification(
                "info intention without product names".into(),
            ));
        }
    }

    Ok(result)
}

/// Strip markdown code fences from text.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let content_start = after.find('\n').map_or(0, |p| p + 1);
        let after = &after[content_start..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    trimmed.to_string()
}
