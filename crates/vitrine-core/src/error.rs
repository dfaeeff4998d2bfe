use thiserror::Error;

#[derive(Debug, Error)]
pub enum VitrineError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    // Workflow errors
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Cannot resolve parameter '{field}' from node '{node}': {reason}")]
    ParameterResolution {
        node: String,
        field: String,
        reason: String,
    },

    #[error("Branch task failed: {node}: {message}")]
    BranchTask { node: String, message: String },

    #[error("Template error: {0}")]
    Template(String),

    /// Elapsed deadline in milliseconds.
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    // Graph construction errors
    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Node not found in graph: {0}")]
    NodeNotFound(String),

    #[error("Edge {from} -> {to} already exists")]
    DuplicateEdge { from: String, to: String },

    #[error("Edge {from} -> {to} would introduce a cycle")]
    Cycle { from: String, to: String },

    #[error("Node already executed: {0}")]
    AlreadyExecuted(String),

    #[error("Graph has no root nodes")]
    EmptyRoots,

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VitrineError {
    /// True when the failure came out of the classification step.
    pub fn is_classification(&self) -> bool {
        matches!(
            self,
            Self::Classification(_)
                | Self::LlmRequest(_)
                | Self::LlmStream(_)
                | Self::LlmParse(_)
                | Self::Template(_)
                | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VitrineError>;

/// A failure attached to a single graph node.
#[derive(Debug, Error)]
#[error("node '{node_id}' failed: {source}")]
pub struct NodeError {
    pub node_id: String,
    #[source]
    pub source: VitrineError,
}

impl NodeError {
    pub fn new(node_id: impl Into<String>, source: VitrineError) -> Self {
        Self {
            node_id: node_id.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_display_carries_node_id() {
        let err = NodeError::new(
            "info",
            VitrineError::ParameterResolution {
                node: "intention".into(),
                field: "intention.product_names".into(),
                reason: "source node has not produced output".into(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("node 'info' failed"));
        assert!(msg.contains("intention.product_names"));
    }

    #[test]
    fn test_classification_family() {
        assert!(VitrineError::Classification("bad json".into()).is_classification());
        assert!(VitrineError::LlmRequest("HTTP 500".into()).is_classification());
        assert!(VitrineError::Timeout(30_000).is_classification());
        assert_eq!(VitrineError::Timeout(250).to_string(), "Timed out after 250ms");
        assert!(!VitrineError::Database("locked".into()).is_classification());
    }
}
