use serde::{Deserialize, Serialize};

use vitrine_core::catalog::{ComboReport, PriceFilter, ProductLookupReport};

/// The customer asks about specific products by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoIntention {
    /// Names as the customer wrote them; may be partial.
    pub product_names: Vec<String>,
    /// Catalog names the classifier matched, in the same order.
    #[serde(default)]
    pub completed_product_names: Option<Vec<String>>,
}

impl InfoIntention {
    /// Names to look up, position by position: the completion where the
    /// classifier gave a non-blank one, else the customer's name.
    pub fn names_for_lookup(&self) -> Vec<String> {
        let completed = self.completed_product_names.as_deref().unwrap_or_default();
        let len = self.product_names.len().max(completed.len());
        (0..len)
            .filter_map(|i| {
                completed
                    .get(i)
                    .filter(|name| !name.trim().is_empty())
                    .or_else(|| self.product_names.get(i))
                    .cloned()
            })
            .collect()
    }

    /// Pairs where the classifier changed the customer's name.
    pub fn corrections(&self) -> Vec<Correction> {
        let Some(completed) = &self.completed_product_names else {
            return Vec::new();
        };
        self.product_names
            .iter()
            .zip(completed)
            .filter(|(original, completed)| !completed.trim().is_empty() && original != completed)
            .map(|(original, completed)| Correction {
                original: original.clone(),
                completed: completed.clone(),
            })
            .collect()
    }
}

/// The customer wants a set of products chosen by criteria.
///
/// Every field is optional. A `None` serializes as `null` so deferred
/// references into the classification output always find the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboIntention {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub product_types: Option<Vec<String>>,
    #[serde(default)]
    pub price_filter: Option<PriceFilter>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

/// What the customer wants. Closed set; routing matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intention {
    Info(InfoIntention),
    Combo(ComboIntention),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionKind {
    Info,
    Combo,
}

impl IntentionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Combo => "combo",
        }
    }
}

impl Intention {
    pub fn kind(&self) -> IntentionKind {
        match self {
            Self::Info(_) => IntentionKind::Info,
            Self::Combo(_) => IntentionKind::Combo,
        }
    }
}

/// Output of the classification step. Produced once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intention: Intention,
}

/// "Did you mean" signal: the classifier completed `original` to `completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub completed: String,
}

/// Anything a node of the intention workflow can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkflowOutput {
    Classification(ClassificationResult),
    Info(ProductLookupReport),
    Combo(ComboReport),
}

impl WorkflowOutput {
    pub fn as_classification(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Classification(c) => Some(c),
            _ => None,
        }
    }
}
