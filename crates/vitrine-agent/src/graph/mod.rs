//! Task graph engine.
//!
//! A run is a small DAG of [`Node`]s. Each node wraps an async [`Task`] and
//! a [`ParamBag`] whose entries are either literals or deferred references
//! into another node's output. The [`GraphExecutor`] starts from the roots,
//! resolves each node's parameters just before invoking it, and applies the
//! node's [`AfterRun`] hook as soon as it completes, so children pruned by
//! the hook are never scheduled.

pub mod dag;
pub mod executor;
pub mod hook;
pub mod node;
pub mod param;

pub use dag::{Invocation, TaskGraph};
pub use executor::{ExecutionResult, GraphExecutor, NodeRun};
pub use hook::{AfterRun, VariantRouter};
pub use node::{FnTask, Node, NodeState, Task};
pub use param::{walk_path, FieldRef, NodeId, NodeOutput, Param, ParamBag, ResolvedParams};
