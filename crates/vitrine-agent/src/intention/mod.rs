//! Intention routing: classify a customer message, then run only the
//! matching catalog branch.

pub mod branches;
pub mod classifier;
pub mod models;
pub mod reply;
pub mod router;
pub mod workflow;

pub use branches::{ComboSearchTask, InfoLookupTask};
pub use classifier::{parse_classification, ClassificationTask};
pub use models::{
    ClassificationResult, ComboIntention, Correction, InfoIntention, Intention, IntentionKind,
    WorkflowOutput,
};
pub use reply::ChatReply;
pub use router::intention_router;
pub use workflow::{IntentionWorkflow, COMBO_NODE, INFO_NODE, INTENTION_NODE};
