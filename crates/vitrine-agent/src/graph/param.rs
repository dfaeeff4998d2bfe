use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use vitrine_core::error::{Result, VitrineError};

/// Identifier of a node within one graph.
pub type NodeId = String;

/// Anything a node can produce. Deferred values read fields off it by path.
pub trait NodeOutput: Send + Sync + 'static {
    /// The value at a dot-separated `path`, or `None` if the path does not exist.
    fn field(&self, path: &str) -> Option<Value>;
}

impl<T> NodeOutput for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn field(&self, path: &str) -> Option<Value> {
        let root = serde_json::to_value(self).ok()?;
        walk_path(root, path)
    }
}

/// Walk `a.b.0.c` through objects and arrays.
///
/// An explicit `null` is a present value; only absent keys return `None`.
pub fn walk_path(root: Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for part in path.split('.') {
        current = match current {
            Value::Object(mut map) => map.remove(part)?,
            Value::Array(mut items) => {
                let idx: usize = part.parse().ok()?;
                if idx >= items.len() {
                    return None;
                }
                items.swap_remove(idx)
            }
            _ => return None,
        };
    }
    Some(current)
}

/// A reference to a field of another node's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub node: NodeId,
    pub path: String,
}

impl FieldRef {
    pub fn new(node: impl Into<NodeId>, path: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            path: path.into(),
        }
    }

    /// Read the referenced field. Fails loudly if the source has not run yet
    /// or the field does not exist.
    pub fn resolve<O: NodeOutput + ?Sized>(&self, source: Option<&O>) -> Result<Value> {
        let output = source.ok_or_else(|| VitrineError::ParameterResolution {
            node: self.node.clone(),
            field: self.path.clone(),
            reason: "source node has not produced output".into(),
        })?;
        output
            .field(&self.path)
            .ok_or_else(|| VitrineError::ParameterResolution {
                node: self.node.clone(),
                field: self.path.clone(),
                reason: "field not present in output".into(),
            })
    }
}

/// One entry of a node's parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Passed through unchanged.
    Literal(Value),
    /// Read from another node's output just before the task runs.
    Deferred(FieldRef),
    /// The first deferred field that resolves to something non-empty, else null.
    /// `null`, `""` and `[]` count as empty.
    FirstOf(Vec<FieldRef>),
}

impl Param {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn deferred(node: impl Into<NodeId>, path: impl Into<String>) -> Self {
        Self::Deferred(FieldRef::new(node, path))
    }

    pub fn first_of(refs: Vec<FieldRef>) -> Self {
        Self::FirstOf(refs)
    }

    /// Nodes this parameter reads from.
    pub fn sources(&self) -> Vec<&str> {
        match self {
            Self::Literal(_) => vec![],
            Self::Deferred(r) => vec![r.node.as_str()],
            Self::FirstOf(refs) => refs.iter().map(|r| r.node.as_str()).collect(),
        }
    }

    fn resolve<O, F>(&self, lookup: &F) -> Result<Value>
    where
        O: NodeOutput,
        F: Fn(&str) -> Option<std::sync::Arc<O>>,
    {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Deferred(r) => r.resolve(lookup(&r.node).as_deref()),
            Self::FirstOf(refs) => {
                for r in refs {
                    let value = r.resolve(lookup(&r.node).as_deref())?;
                    if !is_empty_value(&value) {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Named parameters of a node, literal or deferred.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    entries: BTreeMap<String, Param>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, param: Param) -> Self {
        self.insert(name, param);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, param: Param) {
        self.entries.insert(name.into(), param);
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every node referenced by a deferred entry.
    pub fn sources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.entries.values().flat_map(Param::sources).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Resolve every entry for `owner`, reading deferred fields through `lookup`.
    pub fn resolve<O, F>(&self, owner: &str, lookup: F) -> Result<ResolvedParams>
    where
        O: NodeOutput,
        F: Fn(&str) -> Option<std::sync::Arc<O>>,
    {
        let mut values = BTreeMap::new();
        for (name, param) in &self.entries {
            values.insert(name.clone(), param.resolve(&lookup)?);
        }
        Ok(ResolvedParams {
            owner: owner.to_string(),
            values,
        })
    }
}

/// Concrete parameter values handed to a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParams {
    owner: NodeId,
    values: BTreeMap<String, Value>,
}

impl ResolvedParams {
    /// Build directly from values, for tasks invoked outside a graph.
    pub fn from_values(owner: impl Into<NodeId>, values: BTreeMap<String, Value>) -> Self {
        Self {
            owner: owner.into(),
            values,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserialize a required parameter.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.values.get(name).ok_or_else(|| self.error(name, "no such parameter"))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            self.error(
                name,
                &format!("expected {}: {}", std::any::type_name::<T>(), e),
            )
        })
    }

    /// Deserialize an optional parameter; absent and null are both `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    /// All values as a JSON object, e.g. for template rendering.
    pub fn to_object(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    fn error(&self, name: &str, reason: &str) -> VitrineError {
        VitrineError::ParameterResolution {
            node: self.owner.clone(),
            field: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
