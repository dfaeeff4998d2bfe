use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use vitrine_core::error::{NodeError, Result, VitrineError};

use super::dag::TaskGraph;
use super::param::{NodeId, NodeOutput};

/// Outcome of one node that actually ran.
pub struct NodeRun<O> {
    pub node_id: NodeId,
    pub outcome: std::result::Result<Arc<O>, Arc<NodeError>>,
    /// Execution time in milliseconds.
    pub elapsed_ms: u64,
}

impl<O> NodeRun<O> {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&Arc<O>> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&NodeError> {
        self.outcome.as_ref().err().map(|e| e.as_ref())
    }
}

/// Everything that happened during one run.
pub struct ExecutionResult<O> {
    /// Nodes that ran, in completion order. Parents precede their children.
    pub runs: Vec<NodeRun<O>>,
    pub total_elapsed_ms: u64,
    pub run_id: String,
    graph: TaskGraph<O>,
}

impl<O: NodeOutput> ExecutionResult<O> {
    pub fn get(&self, node_id: &str) -> Option<&NodeRun<O>> {
        self.runs.iter().find(|r| r.node_id == node_id)
    }

    pub fn executed(&self, node_id: &str) -> bool {
        self.get(node_id).is_some()
    }

    pub fn executed_ids(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.node_id.as_str()).collect()
    }

    pub fn output(&self, node_id: &str) -> Option<&Arc<O>> {
        self.get(node_id).and_then(NodeRun::output)
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeRun<O>> {
        self.runs.iter().filter(|r| !r.succeeded())
    }

    /// True when every executed node succeeded.
    pub fn succeeded(&self) -> bool {
        self.runs.iter().all(NodeRun::succeeded)
    }

    /// The graph as it stood when the run finished, pruned edges removed.
    pub fn graph(&self) -> &TaskGraph<O> {
        &self.graph
    }
}

type InFlight<O> = FuturesUnordered<BoxFuture<'static, (NodeId, u64, Result<O>)>>;

/// Runs a [`TaskGraph`] from a set of roots.
///
/// Execution is cooperative: every running task is a future in one
/// `FuturesUnordered`, and completions are handled one at a time. When a
/// node completes its output is stored and its hook applied before any of
/// its children are looked at, so a pruned child is never scheduled.
pub struct GraphExecutor<O> {
    graph: TaskGraph<O>,
    roots: Vec<NodeId>,
}

impl<O: NodeOutput> GraphExecutor<O> {
    pub fn new<I, S>(graph: TaskGraph<O>, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self {
            graph,
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn graph(&self) -> &TaskGraph<O> {
        &self.graph
    }

    fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(VitrineError::EmptyRoots);
        }
        let mut seen = HashSet::new();
        for root in &self.roots {
            if !seen.insert(root.as_str()) {
                return Err(VitrineError::Graph(format!("duplicate root '{}'", root)));
            }
            if !self.graph.contains(root) {
                return Err(VitrineError::NodeNotFound(root.clone()));
            }
            if !self.graph.parents(root).is_empty() {
                return Err(VitrineError::Graph(format!(
                    "root '{}' has incoming edges",
                    root
                )));
            }
        }
        self.graph.check_deferred_sources()
    }

    /// Run the graph to completion.
    ///
    /// Fails only when the root set is malformed. Node failures are recorded
    /// in the result and stop that node's descendants from being scheduled.
    pub async fn run(self) -> Result<ExecutionResult<O>> {
        self.validate()?;

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("graph_run", run_id = %run_id);
        let Self { mut graph, roots } = self;

        async move {
            let start = Instant::now();
            let mut in_flight: InFlight<O> = FuturesUnordered::new();
            let mut scheduled: HashSet<NodeId> = HashSet::new();
            let mut runs = Vec::new();

            info!(roots = ?roots, nodes = graph.len(), "Starting graph run");

            for root in &roots {
                launch(&mut graph, root, &mut in_flight, &mut scheduled, &mut runs);
            }

            while let Some((node_id, elapsed_ms, result)) = in_flight.next().await {
                let outcome = graph.complete(&node_id, result);
                let succeeded = outcome.is_ok();
                debug!(node_id = %node_id, succeeded, elapsed_ms, "Node execution complete");
                runs.push(NodeRun {
                    node_id: node_id.clone(),
                    outcome,
                    elapsed_ms,
                });

                if !succeeded {
                    let skipped = graph.children(&node_id).len();
                    if skipped > 0 {
                        warn!(node_id = %node_id, skipped, "Node failed, descendants not scheduled");
                    }
                    continue;
                }

                let ready: Vec<NodeId> = graph
                    .children(&node_id)
                    .iter()
                    .filter(|c| !scheduled.contains(*c) && graph.is_ready(c))
                    .cloned()
                    .collect();
                for child in &ready {
                    launch(&mut graph, child, &mut in_flight, &mut scheduled, &mut runs);
                }
            }

            let total_elapsed_ms = start.elapsed().as_millis() as u64;
            info!(
                executed = runs.len(),
                failed = runs.iter().filter(|r| !r.succeeded()).count(),
                total_elapsed_ms,
                "Graph run complete"
            );

            Ok(ExecutionResult {
                runs,
                total_elapsed_ms,
                run_id,
                graph,
            })
        }
        .instrument(span)
        .await
    }
}

fn launch<O: NodeOutput>(
    graph: &mut TaskGraph<O>,
    id: &str,
    in_flight: &mut InFlight<O>,
    scheduled: &mut HashSet<NodeId>,
    runs: &mut Vec<NodeRun<O>>,
) {
    scheduled.insert(id.to_string());
    match graph.prepare(id) {
        Ok(invocation) => {
            debug!(node_id = id, "Scheduling node");
            let node_id = id.to_string();
            in_flight.push(Box::pin(async move {
                let started = Instant::now();
                let result = invocation.invoke().await;
                (node_id, started.elapsed().as_millis() as u64, result)
            }));
        }
        Err(err) => runs.push(NodeRun {
            node_id: id.to_string(),
            outcome: Err(err),
            elapsed_ms: 0,
        }),
    }
}
