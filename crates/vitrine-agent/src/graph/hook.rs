use std::fmt::Debug;

use tracing::warn;

use super::param::NodeId;

/// Post-execution hook attached to a node.
///
/// Runs as part of the node's completion, before any child is considered
/// for scheduling. It sees the freshly produced output and the node's
/// current children and returns the ones that stay connected. Everything
/// else is disconnected for the rest of the run.
pub trait AfterRun<O>: Send + Sync + 'static {
    fn surviving_children(&self, output: &O, children: &[NodeId]) -> Vec<NodeId>;
}

/// Keeps exactly the child registered for the output's variant.
///
/// `key_of` extracts a variant key from the output. Children registered
/// under a different key are pruned; children that were never registered
/// are left alone.
pub struct VariantRouter<O, K> {
    key_of: Box<dyn Fn(&O) -> Option<K> + Send + Sync>,
    branches: Vec<(K, NodeId)>,
}

impl<O, K> VariantRouter<O, K>
where
    K: PartialEq + Debug + Send + Sync + 'static,
{
    pub fn new(key_of: impl Fn(&O) -> Option<K> + Send + Sync + 'static) -> Self {
        Self {
            key_of: Box::new(key_of),
            branches: Vec::new(),
        }
    }

    /// Register `node` as the branch for `key`.
    pub fn branch(mut self, key: K, node: impl Into<NodeId>) -> Self {
        self.branches.push((key, node.into()));
        self
    }

    pub fn branches(&self) -> impl Iterator<Item = (&K, &str)> {
        self.branches.iter().map(|(k, n)| (k, n.as_str()))
    }

    fn registered_key(&self, child: &str) -> Option<&K> {
        self.branches
            .iter()
            .find(|(_, n)| n == child)
            .map(|(k, _)| k)
    }
}

impl<O, K> AfterRun<O> for VariantRouter<O, K>
where
    O: 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    fn surviving_children(&self, output: &O, children: &[NodeId]) -> Vec<NodeId> {
        let key = (self.key_of)(output);
        if key.is_none() {
            warn!("Router found no variant in output, pruning every registered branch");
        }

        children
            .iter()
            .filter(|child| match self.registered_key(child) {
                Some(branch_key) => key.as_ref() == Some(branch_key),
                None => true,
            })
            .cloned()
            .collect()
    }
}
