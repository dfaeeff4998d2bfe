pub mod graph;
pub mod intention;
pub mod prompt;

pub use graph::{
    AfterRun, ExecutionResult, FieldRef, FnTask, GraphExecutor, Node, NodeRun, Param, ParamBag,
    ResolvedParams, Task, TaskGraph, VariantRouter,
};
pub use intention::{ChatReply, ClassificationResult, Intention, IntentionWorkflow, WorkflowOutput};
pub use prompt::PromptTemplate;
