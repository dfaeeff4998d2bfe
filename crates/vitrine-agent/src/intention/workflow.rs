use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use vitrine_core::config::{AppConfig, ModelConfig};
use vitrine_core::error::Result;
use vitrine_core::traits::{Catalog, LlmClient};

use super::branches::{ComboSearchTask, InfoLookupTask};
use super::classifier::ClassificationTask;
use super::models::WorkflowOutput;
use super::reply::ChatReply;
use super::router::intention_router;
use crate::graph::{ExecutionResult, GraphExecutor, Node, Param, ParamBag, TaskGraph};
use crate::prompt::PromptTemplate;

pub const INTENTION_NODE: &str = "intention";
pub const INFO_NODE: &str = "info";
pub const COMBO_NODE: &str = "combo";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds and runs the classify-then-branch graph for one message.
///
/// Each call builds a fresh graph: a classification root with the router
/// hook, an info lookup branch and a combo search branch. Branch parameters
/// are deferred references into the classification output.
pub struct IntentionWorkflow {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn Catalog>,
    model: ModelConfig,
    prompt: Arc<PromptTemplate>,
    timeout: Option<Duration>,
}

impl IntentionWorkflow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        catalog: Arc<dyn Catalog>,
        model: ModelConfig,
        prompt: PromptTemplate,
    ) -> Self {
        Self {
            llm,
            catalog,
            model,
            prompt: Arc::new(prompt),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Model, prompt file and timeout taken from the config.
    pub fn from_config(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        catalog: Arc<dyn Catalog>,
    ) -> Result<Self> {
        let prompt = match config.prompt_path() {
            Some(path) => PromptTemplate::load(&path)?,
            None => PromptTemplate::bundled()?,
        };
        let timeout = match config.workflow.classification_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(Self::new(llm, catalog, config.model.clone(), prompt).with_timeout(timeout))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Build the graph for `message`. Nothing runs yet.
    pub fn build_graph(
        &self,
        message: &str,
        available_tags: Vec<String>,
        available_products: Vec<String>,
    ) -> Result<TaskGraph<WorkflowOutput>> {
        let classify = ClassificationTask::new(
            Arc::clone(&self.llm),
            self.model.clone(),
            Arc::clone(&self.prompt),
        )
        .with_timeout(self.timeout);

        let intention = Node::new(INTENTION_NODE, Arc::new(classify))
            .with_param("message", Param::literal(message))
            .with_param("available_tags", Param::literal(available_tags))
            .with_param("available_products", Param::literal(available_products))
            .with_hook(Arc::new(intention_router(INFO_NODE, COMBO_NODE)));

        let info = Node::new(
            INFO_NODE,
            Arc::new(InfoLookupTask::new(Arc::clone(&self.catalog))),
        )
        .with_param(
            "product_names",
            Param::deferred(INTENTION_NODE, "intention.product_names"),
        )
        .with_param(
            "completed_product_names",
            Param::deferred(INTENTION_NODE, "intention.completed_product_names"),
        );

        let combo = Node::new(
            COMBO_NODE,
            Arc::new(ComboSearchTask::new(Arc::clone(&self.catalog))),
        )
        .with_params(combo_params());

        let mut graph = TaskGraph::new();
        graph.add_node(intention)?;
        graph.add_node(info)?;
        graph.add_node(combo)?;
        graph.connect(INTENTION_NODE, INFO_NODE)?;
        graph.connect(INTENTION_NODE, COMBO_NODE)?;
        Ok(graph)
    }

    /// Classify `message` and run the matching branch.
    ///
    /// Fails only if the catalog context cannot be read. Classification and
    /// branch failures are carried in the returned result.
    pub async fn run(&self, message: &str) -> Result<ExecutionResult<WorkflowOutput>> {
        let available_tags = self.catalog.all_tags().await?;
        let available_products = self.catalog.all_product_names().await?;
        debug!(
            tags = available_tags.len(),
            products = available_products.len(),
            "Loaded classifier context"
        );

        let graph = self.build_graph(message, available_tags, available_products)?;
        let result = GraphExecutor::new(graph, [INTENTION_NODE]).run().await?;
        info!(
            run_id = %result.run_id,
            executed = ?result.executed_ids(),
            elapsed_ms = result.total_elapsed_ms,
            "Intention workflow finished"
        );
        Ok(result)
    }

    /// Run and interpret the result for the customer.
    pub async fn respond(&self, message: &str) -> Result<ChatReply> {
        let result = self.run(message).await?;
        let reply = ChatReply::from_execution(&result);
        if reply.is_empty_combo() {
            return Ok(reply.with_available_tags(self.catalog.all_tags().await?));
        }
        Ok(reply)
    }
}

fn combo_params() -> ParamBag {
    ["tag", "brand", "product_types", "price_filter", "max_price"]
        .into_iter()
        .fold(ParamBag::new(), |bag, field| {
            bag.with(
                field,
                Param::deferred(INTENTION_NODE, format!("intention.{}", field)),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeState;
    use vitrine_test_utils::{sample_products, seeded_catalog, test_model_config, ScriptedLlm};

    fn workflow(llm: ScriptedLlm) -> IntentionWorkflow {
        let catalog = seeded_catalog(&sample_products());
        IntentionWorkflow::new(
            Arc::new(llm),
            Arc::new(catalog),
            test_model_config(),
            PromptTemplate::bundled().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_build_graph_shape() {
        let wf = workflow(ScriptedLlm::text("{}"));
        let graph = wf
            .build_graph("hi", vec!["Gaming".into()], vec!["X".into()])
            .unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(
            graph.children(INTENTION_NODE),
            &[INFO_NODE.to_string(), COMBO_NODE.to_string()]
        );
        let combo = graph.node(COMBO_NODE).unwrap();
        assert_eq!(combo.params().sources(), vec![INTENTION_NODE]);
        assert!(matches!(combo.state(), NodeState::Pending));
        let info = graph.node(INFO_NODE).unwrap();
        assert!(info.params().get("completed_product_names").is_some());
        graph.check_deferred_sources().unwrap();
    }

    #[tokio::test]
    async fn test_prompt_receives_catalog_context() {
        let llm = ScriptedLlm::text(r#"{"intention": {"kind": "combo", "tag": "Gaming"}}"#);
        let seen = llm.requests();
        let wf = workflow(llm);
        wf.run("gaming setup").await.unwrap();

        let requests = seen.lock().unwrap();
        let system = requests[0][0].text();
        assert!(system.contains("Gaming"));
        assert!(system.contains("HyperX Alloy Origins"));
    }

    #[test]
    fn test_from_config_zero_timeout_disables_deadline() {
        let mut config = AppConfig::default();
        config.workflow.classification_timeout_secs = 0;
        let catalog = vitrine_catalog::SqliteCatalog::in_memory().unwrap();
        let wf = IntentionWorkflow::from_config(
            &config,
            Arc::new(ScriptedLlm::text("{}")),
            Arc::new(catalog),
        )
        .unwrap();
        assert!(wf.timeout.is_none());
    }
}
