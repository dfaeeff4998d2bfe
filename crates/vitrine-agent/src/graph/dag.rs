use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info};

use vitrine_core::error::{NodeError, Result, VitrineError};

use super::node::{Node, NodeState, Task};
use super::param::{NodeId, NodeOutput, ResolvedParams};

/// A node whose parameters are resolved and which is ready to be awaited.
pub struct Invocation<O> {
    pub node_id: NodeId,
    task: Arc<dyn Task<O>>,
    params: ResolvedParams,
}

impl<O: NodeOutput> Invocation<O> {
    /// Run the task. Owns everything it needs, so it can be polled anywhere.
    pub async fn invoke(self) -> Result<O> {
        self.task.run(self.params).await
    }
}

/// Nodes plus the directed edges between them, for a single run.
///
/// Built fresh per request and consumed by the executor. Edges are kept in
/// insertion order so children are always visited deterministically.
pub struct TaskGraph<O> {
    nodes: HashMap<NodeId, Node<O>>,
    order: Vec<NodeId>,
    edges: HashMap<NodeId, Vec<NodeId>>,
}

impl<O: NodeOutput> Default for TaskGraph<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: NodeOutput> TaskGraph<O> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: Node<O>) -> Result<()> {
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) {
            return Err(VitrineError::Graph(format!("duplicate node id '{}'", id)));
        }
        self.order.push(id.clone());
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Add `to` as a child of `from`.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<()> {
        for id in [from, to] {
            if !self.nodes.contains_key(id) {
                return Err(VitrineError::NodeNotFound(id.to_string()));
            }
        }
        if self.children(from).iter().any(|c| c == to) {
            return Err(VitrineError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if from == to || self.reaches(to, from) {
            return Err(VitrineError::Cycle {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.edges
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        debug!(from, to, "Connected nodes");
        Ok(())
    }

    /// Remove the edge `from -> to`. Returns whether it existed.
    pub fn disconnect(&mut self, from: &str, to: &str) -> bool {
        let Some(children) = self.edges.get_mut(from) else {
            return false;
        };
        let before = children.len();
        children.retain(|c| c != to);
        children.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn node(&self, id: &str) -> Option<&Node<O>> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node<O>> {
        self.nodes.get_mut(id)
    }

    pub fn children(&self, id: &str) -> &[NodeId] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with an edge into `id`, in insertion order.
    pub fn parents(&self, id: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|p| self.children(p).iter().any(|c| c == id))
            .map(String::as_str)
            .collect()
    }

    pub fn output_of(&self, id: &str) -> Option<Arc<O>> {
        self.nodes.get(id).and_then(|n| n.output().cloned())
    }

    /// Pending, with at least one parent, and every parent complete.
    pub fn is_ready(&self, id: &str) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !node.is_pending() {
            return false;
        }
        let parents = self.parents(id);
        !parents.is_empty()
            && parents
                .iter()
                .all(|p| self.nodes.get(*p).is_some_and(Node::is_complete))
    }

    /// Every deferred parameter must read from an existing ancestor.
    pub fn check_deferred_sources(&self) -> Result<()> {
        for id in &self.order {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for source in node.params().sources() {
                if !self.nodes.contains_key(source) {
                    return Err(VitrineError::Graph(format!(
                        "node '{}' reads from unknown node '{}'",
                        id, source
                    )));
                }
                if source == id.as_str() || !self.reaches(source, id) {
                    return Err(VitrineError::Graph(format!(
                        "node '{}' reads from '{}', which is not an ancestor",
                        id, source
                    )));
                }
            }
        }
        Ok(())
    }

    fn reaches(&self, start: &str, target: &str) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.children(id).iter().map(String::as_str));
            }
        }
        false
    }

    /// Resolve a node's parameters and mark it running.
    ///
    /// A node that is not pending is rejected without touching its state.
    /// A resolution failure marks the node failed.
    pub fn prepare(&mut self, id: &str) -> std::result::Result<Invocation<O>, Arc<NodeError>> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| Arc::new(NodeError::new(id, VitrineError::NodeNotFound(id.into()))))?;
        if !node.is_pending() {
            return Err(Arc::new(NodeError::new(
                id,
                VitrineError::AlreadyExecuted(id.to_string()),
            )));
        }

        let resolved = node.params().resolve(id, |source| self.output_of(source));
        let task = node.task();

        match resolved {
            Ok(params) => {
                self.set_state(id, NodeState::Running);
                Ok(Invocation {
                    node_id: id.to_string(),
                    task,
                    params,
                })
            }
            Err(e) => {
                error!(node_id = id, error = %e, "Parameter resolution failed");
                let err = Arc::new(NodeError::new(id, e));
                self.set_state(id, NodeState::Failed(Arc::clone(&err)));
                Err(err)
            }
        }
    }

    /// Store a task's result and, on success, apply the node's hook.
    ///
    /// Children the hook does not keep are disconnected before this returns.
    pub fn complete(
        &mut self,
        id: &str,
        result: Result<O>,
    ) -> std::result::Result<Arc<O>, Arc<NodeError>> {
        let output = match result {
            Ok(output) => Arc::new(output),
            Err(e) => {
                error!(node_id = id, error = %e, "Node failed");
                let err = Arc::new(NodeError::new(id, e));
                self.set_state(id, NodeState::Failed(Arc::clone(&err)));
                return Err(err);
            }
        };
        self.set_state(id, NodeState::Complete(Arc::clone(&output)));

        let hook = self.nodes.get(id).and_then(|n| n.hook().cloned());
        if let Some(hook) = hook {
            let children = self.children(id).to_vec();
            let surviving = hook.surviving_children(&output, &children);
            for child in children.iter().filter(|c| !surviving.contains(c)) {
                if self.disconnect(id, child) {
                    info!(parent = id, pruned = %child, "Pruned branch");
                }
            }
        }

        Ok(output)
    }

    /// Resolve, run and complete a single node in place.
    pub async fn execute_node(&mut self, id: &str) -> std::result::Result<Arc<O>, Arc<NodeError>> {
        let invocation = self.prepare(id)?;
        let result = invocation.invoke().await;
        self.complete(id, result)
    }

    fn set_state(&mut self, id: &str, state: NodeState<O>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_state(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::hook::VariantRouter;
    use crate::graph::node::FnTask;
    use crate::graph::param::Param;
    use serde_json::{json, Value};

    fn constant(value: Value) -> Arc<dyn Task<Value>> {
        Arc::new(FnTask::new("constant", move |_p: ResolvedParams| {
            let value = value.clone();
            async move { Ok::<_, VitrineError>(value) }
        }))
    }

    fn echo() -> Arc<dyn Task<Value>> {
        Arc::new(FnTask::new("echo", |p: ResolvedParams| async move {
            Ok::<_, VitrineError>(p.to_object())
        }))
    }

    fn diamond() -> TaskGraph<Value> {
        let mut g = TaskGraph::new();
        for id in ["a", "b", "c", "d"] {
            g.add_node(Node::new(id, echo())).unwrap();
        }
        g.connect("a", "b").unwrap();
        g.connect("a", "c").unwrap();
        g.connect("b", "d").unwrap();
        g.connect("c", "d").unwrap();
        g
    }

    #[test]
    fn test_connect_rejects_duplicates_and_cycles() {
        let mut g = diamond();
        assert!(matches!(
            g.connect("a", "b"),
            Err(VitrineError::DuplicateEdge { .. })
        ));
        assert!(matches!(g.connect("d", "a"), Err(VitrineError::Cycle { .. })));
        assert!(matches!(g.connect("b", "b"), Err(VitrineError::Cycle { .. })));
        assert!(matches!(
            g.connect("a", "zzz"),
            Err(VitrineError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut g = diamond();
        assert!(matches!(
            g.add_node(Node::new("a", echo())),
            Err(VitrineError::Graph(_))
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut g = diamond();
        assert!(g.disconnect("a", "b"));
        assert!(!g.disconnect("a", "b"));
        assert!(!g.disconnect("zzz", "b"));
        assert_eq!(g.children("a"), &["c".to_string()]);
        assert_eq!(g.parents("d"), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_execute_node_resolves_deferred_after_parent() {
        let mut g = TaskGraph::new();
        g.add_node(Node::new("root", constant(json!({"names": ["Logi Mouse"]}))))
            .unwrap();
        g.add_node(Node::new("child", echo()).with_param("names", Param::deferred("root", "names")))
            .unwrap();
        g.connect("root", "child").unwrap();

        g.execute_node("root").await.unwrap();
        let out = g.execute_node("child").await.unwrap();
        assert_eq!(*out, json!({"names": ["Logi Mouse"]}));
    }

    #[tokio::test]
    async fn test_deferred_before_parent_fails_and_marks_node() {
        let mut g = TaskGraph::new();
        g.add_node(Node::new("root", constant(json!({"x": 1})))).unwrap();
        g.add_node(Node::new("child", echo()).with_param("x", Param::deferred("root", "x")))
            .unwrap();

        let err = g.execute_node("child").await.unwrap_err();
        assert_eq!(err.node_id, "child");
        assert!(matches!(err.source, VitrineError::ParameterResolution { .. }));
        assert!(matches!(
            g.node("child").unwrap().state(),
            NodeState::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_re_execute_is_rejected_and_output_kept() {
        let mut g = TaskGraph::new();
        g.add_node(Node::new("root", constant(json!(1)))).unwrap();
        let first = g.execute_node("root").await.unwrap();

        let err = g.execute_node("root").await.unwrap_err();
        assert!(matches!(err.source, VitrineError::AlreadyExecuted(_)));
        assert!(Arc::ptr_eq(&first, &g.output_of("root").unwrap()));
    }

    #[tokio::test]
    async fn test_hook_prunes_before_complete_returns() {
        let router = VariantRouter::new(|out: &Value| {
            out.get("kind").and_then(Value::as_str).map(str::to_string)
        })
        .branch("info".to_string(), "info")
        .branch("combo".to_string(), "combo");

        let mut g = TaskGraph::new();
        g.add_node(Node::new("root", constant(json!({"kind": "combo"}))).with_hook(Arc::new(router)))
            .unwrap();
        g.add_node(Node::new("info", echo())).unwrap();
        g.add_node(Node::new("combo", echo())).unwrap();
        g.connect("root", "info").unwrap();
        g.connect("root", "combo").unwrap();

        g.execute_node("root").await.unwrap();
        assert_eq!(g.children("root"), &["combo".to_string()]);
        assert!(g.is_ready("combo"));
        assert!(!g.is_ready("info"));
    }

    #[tokio::test]
    async fn test_failed_task_skips_hook() {
        let router = VariantRouter::new(|_: &Value| None::<String>).branch("x".to_string(), "child");
        let failing: Arc<dyn Task<Value>> = Arc::new(FnTask::new("boom", |_p: ResolvedParams| async {
            Err::<Value, _>(VitrineError::Classification("bad output".into()))
        }));

        let mut g = TaskGraph::new();
        g.add_node(Node::new("root", failing).with_hook(Arc::new(router))).unwrap();
        g.add_node(Node::new("child", echo())).unwrap();
        g.connect("root", "child").unwrap();

        assert!(g.execute_node("root").await.is_err());
        assert_eq!(g.children("root"), &["child".to_string()]);
        assert!(!g.is_ready("child"));
    }
}
