//! # task-divider
//!
//! One node of an agent-orchestration graph: turns a high-level task into a
//! tree of smaller subtasks by asking a generative model for a structured
//! decomposition, validating the model's free-text answer, and growing the
//! task tree under a hard depth bound.
//!
//! ## Flow
//!
//! ```text
//!  workflow context ──▶ TaskDivider ──▶ completion backend
//!                          │                  │
//!                          ◀── extractor ◀────┘
//!                          │
//!              tree mutation + outcome tag + progress events
//! ```
//!
//! The divider exposes a blocking and a suspension-capable entry point with
//! identical semantics. Unusable model output is collapsed into one
//! invalid-generation signal and retried under a dual time/attempt bound;
//! an explicit model decline and the depth guard are graceful `"failed"`
//! outcomes, while transport failures and retry exhaustion are fatal to the
//! node.
//!
//! ## Modules
//! - [`task`]: the arena-backed decomposition tree
//! - [`divider`]: orchestrator, extractor, and retry policy
//! - [`llm`]: the model-completion collaborator boundary
//! - [`tools`]: tool-capability advertisement
//! - [`events`]: fire-and-forget progress blocks
//! - [`config`]: environment-sourced, explicitly injected configuration
//!
//! ## Example
//!
//! ```no_run
//! use task_divider::{DividerConfig, TaskDivider, TaskTree, WorkflowContext};
//! # use task_divider::llm::{ChatCompletion, CompletionBackend, CompletionRequest};
//! # struct MyBackend;
//! # impl CompletionBackend for MyBackend {
//! #     fn complete(&self, _: &CompletionRequest) -> anyhow::Result<ChatCompletion> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! # fn main() -> anyhow::Result<()> {
//! let divider = TaskDivider::new(MyBackend, DividerConfig::from_env()?);
//! let mut tree = TaskTree::new("Build a website");
//! let mut ctx = WorkflowContext::new(tree.root());
//!
//! let outcome = divider.divide(&mut tree, &mut ctx)?;
//! println!("decomposition: {}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod divider;
pub mod events;
pub mod llm;
pub mod task;
pub mod tools;

pub use config::{ConfigError, DividerConfig};
pub use divider::{
    DecompositionResult, DividerError, Outcome, RetryPolicy, TaskDivider, WorkflowContext,
};
pub use events::{EventSink, NullSink, TracingSink};
pub use task::{NodeId, SiblingSummary, SubtaskSpec, TaskNode, TaskTree, TreeError};
pub use tools::{StaticToolCatalog, ToolCatalog, ToolSpec};
