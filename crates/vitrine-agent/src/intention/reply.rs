use std::fmt::Write as _;

use serde::Serialize;

use vitrine_core::catalog::{ComboReport, LookupEntry, ProductLookupReport};

use super::models::{Correction, Intention, WorkflowOutput};
use crate::graph::ExecutionResult;

const UNCLASSIFIED_TEXT: &str = "Sorry, I couldn't understand that request. \
Ask about a product by name, or for a combo by tag, brand, product type or price.";

/// What the customer gets back for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatReply {
    Info {
        report: ProductLookupReport,
        corrections: Vec<Correction>,
    },
    Combo {
        report: ComboReport,
        /// Filled in only when the combo came back empty.
        available_tags: Vec<String>,
    },
    /// Classification failed or matched no branch.
    Unclassified { reason: String },
    /// The selected branch itself failed.
    Failed { node: String, message: String },
}

impl ChatReply {
    /// Interpret the executed node set by output type.
    pub fn from_execution(result: &ExecutionResult<WorkflowOutput>) -> Self {
        let mut intention: Option<&Intention> = None;
        let mut reply = None;

        for run in &result.runs {
            match &run.outcome {
                Ok(output) => match output.as_ref() {
                    WorkflowOutput::Classification(c) => intention = Some(&c.intention),
                    WorkflowOutput::Info(report) => {
                        reply = Some(ChatReply::Info {
                            report: report.clone(),
                            corrections: Vec::new(),
                        })
                    }
                    WorkflowOutput::Combo(report) => {
                        reply = Some(ChatReply::Combo {
                            report: report.clone(),
                            available_tags: Vec::new(),
                        })
                    }
                },
                Err(err) if err.source.is_classification() => {
                    return ChatReply::Unclassified {
                        reason: err.source.to_string(),
                    };
                }
                Err(err) => {
                    reply = Some(ChatReply::Failed {
                        node: err.node_id.clone(),
                        message: err.source.to_string(),
                    })
                }
            }
        }

        match (reply, intention) {
            (Some(ChatReply::Info { report, .. }), Some(Intention::Info(info))) => ChatReply::Info {
                report,
                corrections: info.corrections(),
            },
            (Some(reply), _) => reply,
            (None, _) => ChatReply::Unclassified {
                reason: "no branch matched the classified intention".into(),
            },
        }
    }

    pub fn is_empty_combo(&self) -> bool {
        matches!(self, ChatReply::Combo { report, .. } if report.products.is_empty())
    }

    pub fn with_available_tags(self, tags: Vec<String>) -> Self {
        match self {
            ChatReply::Combo { report, .. } => ChatReply::Combo {
                report,
                available_tags: tags,
            },
            other => other,
        }
    }

    pub fn corrections(&self) -> &[Correction] {
        match self {
            ChatReply::Info { corrections, .. } => corrections,
            _ => &[],
        }
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        match self {
            ChatReply::Info {
                report,
                corrections,
            } => {
                render_info(&mut out, report);
                for c in corrections {
                    let _ = writeln!(out, "Note: Completed '{}' to '{}'", c.original, c.completed);
                }
            }
            ChatReply::Combo {
                report,
                available_tags,
            } => render_combo(&mut out, report, available_tags),
            ChatReply::Unclassified { .. } => {
                let _ = writeln!(out, "{}", UNCLASSIFIED_TEXT);
            }
            ChatReply::Failed { message, .. } => {
                let _ = writeln!(out, "Sorry, the lookup failed: {}", message);
            }
        }
        out
    }
}

fn render_info(out: &mut String, report: &ProductLookupReport) {
    for (i, product) in report.products().enumerate() {
        let _ = writeln!(out, "Product {} Information:", i + 1);
        let _ = writeln!(out, "  ID: {}", product.id);
        let _ = writeln!(out, "  Name: {}", product.name);
        let _ = writeln!(out, "  Type: {}", product.category);
        let _ = writeln!(out, "  Brand: {}", product.brand);
        let _ = writeln!(out, "  Price: ${:.2}", product.price);
        let _ = writeln!(out, "  Stock Quantity: {}", product.stock_quantity);
        let _ = writeln!(out, "  Min Stock Level: {}", product.min_stock_level);
        let _ = writeln!(out, "  Tags: {}", product.tags.join(", "));
        let _ = writeln!(out, "  Status: {}", product.stock_status());
        out.push('\n');
    }

    let missing: Vec<&str> = report
        .entries
        .iter()
        .filter_map(|e| match e {
            LookupEntry::NotFound { name } => Some(name.as_str()),
            LookupEntry::Found { .. } => None,
        })
        .collect();
    if !missing.is_empty() {
        let _ = writeln!(out, "Not found: {}", missing.join(", "));
    }
}

fn render_combo(out: &mut String, report: &ComboReport, available_tags: &[String]) {
    if report.products.is_empty() {
        let _ = writeln!(out, "No products found matching the criteria.");
        if !available_tags.is_empty() {
            let _ = writeln!(out, "Available tags: {}", available_tags.join(", "));
        }
        return;
    }

    let _ = writeln!(out, "Selected Combo ({} items):", report.products.len());
    let _ = writeln!(out, "Total Price: ${:.2}", report.total_price);
    out.push('\n');
    for p in &report.products {
        let _ = writeln!(
            out,
            "  - {} | Price: ${:.2} | Type: {} | Brand: {}",
            p.name, p.price, p.category, p.brand
        );
    }
    if let Some(range) = &report.diagnostics.price_range {
        let _ = writeln!(out, "\nPrice range: ${:.2} - ${:.2}", range.min, range.max);
    }
}
