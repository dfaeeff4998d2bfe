use super::models::{IntentionKind, WorkflowOutput};
use crate::graph::VariantRouter;

/// Hook for the classification node: keeps the branch registered for the
/// classified intention and prunes the other.
pub fn intention_router(
    info_node: &str,
    combo_node: &str,
) -> VariantRouter<WorkflowOutput, IntentionKind> {
    VariantRouter::new(|output: &WorkflowOutput| {
        output
            .as_classification()
            .map(|result| result.intention.kind())
    })
    .branch(IntentionKind::Info, info_node)
    .branch(IntentionKind::Combo, combo_node)
}
