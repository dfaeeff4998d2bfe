use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use vitrine_core::error::{NodeError, Result};

use super::hook::AfterRun;
use super::param::{NodeId, NodeOutput, Param, ParamBag, ResolvedParams};

/// One asynchronous unit of work wrapped by a node.
pub trait Task<O>: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Run with fully resolved parameters.
    fn run(&self, params: ResolvedParams) -> BoxFuture<'_, Result<O>>;
}

/// Adapter turning an async closure into a [`Task`].
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F> FnTask<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<O, F, Fut> Task<O> for FnTask<F>
where
    O: Send + 'static,
    F: Fn(ResolvedParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, params: ResolvedParams) -> BoxFuture<'_, Result<O>> {
        Box::pin((self.f)(params))
    }
}

/// Lifecycle of a node within one run.
#[derive(Debug)]
pub enum NodeState<O> {
    Pending,
    Running,
    Complete(Arc<O>),
    Failed(Arc<NodeError>),
}

impl<O> Clone for NodeState<O> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Running => Self::Running,
            Self::Complete(o) => Self::Complete(Arc::clone(o)),
            Self::Failed(e) => Self::Failed(Arc::clone(e)),
        }
    }
}

/// A vertex of the task graph.
///
/// Holds the task, its parameter bag, the output slot and an optional
/// post-execution hook. Edges live in the owning [`TaskGraph`](super::TaskGraph).
pub struct Node<O> {
    id: NodeId,
    task: Arc<dyn Task<O>>,
    params: ParamBag,
    state: NodeState<O>,
    hook: Option<Arc<dyn AfterRun<O>>>,
}

impl<O: NodeOutput> Node<O> {
    pub fn new(id: impl Into<NodeId>, task: Arc<dyn Task<O>>) -> Self {
        Self {
            id: id.into(),
            task,
            params: ParamBag::new(),
            state: NodeState::Pending,
            hook: None,
        }
    }

    /// Add one parameter.
    pub fn with_param(mut self, name: impl Into<String>, param: Param) -> Self {
        self.params.insert(name, param);
        self
    }

    /// Replace the whole parameter bag.
    pub fn with_params(mut self, params: ParamBag) -> Self {
        self.params = params;
        self
    }

    /// Attach a post-execution hook.
    pub fn with_hook(mut self, hook: Arc<dyn AfterRun<O>>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task_name(&self) -> &str {
        self.task.name()
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn state(&self) -> &NodeState<O> {
        &self.state
    }

    pub(crate) fn hook(&self) -> Option<&Arc<dyn AfterRun<O>>> {
        self.hook.as_ref()
    }

    /// The produced output, once the node has completed.
    pub fn output(&self) -> Option<&Arc<O>> {
        match &self.state {
            NodeState::Complete(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, NodeState::Pending)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, NodeState::Complete(_))
    }

    pub(crate) fn task(&self) -> Arc<dyn Task<O>> {
        Arc::clone(&self.task)
    }

    pub(crate) fn set_state(&mut self, state: NodeState<O>) {
        self.state = state;
    }
}

impl<O: NodeOutput> std::fmt::Debug for Node<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("task", &self.task.name())
            .field("params", &self.params)
            .field(
                "state",
                &match self.state {
                    NodeState::Pending => "pending",
                    NodeState::Running => "running",
                    NodeState::Complete(_) => "complete",
                    NodeState::Failed(_) => "failed",
                },
            )
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
