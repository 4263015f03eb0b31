//! Task divider - the decomposition orchestrator.
//!
//! Given a task node and the workflow's prior output, the divider asks the
//! completion backend for a decomposition, validates the answer through the
//! extractor, grows the task tree on success, and hands an outcome tag back
//! to the surrounding workflow graph.
//!
//! # State machine (one attempt)
//! ```text
//! evaluating-depth ──guard trips──▶ Failed
//!        │
//!        ▼
//! invoking-model ──▶ extracting-result ──▶ Success | Failed
//!                            │
//!                            └─ invalid generation ──▶ retried, then fatal
//! ```
//!
//! The blocking and suspension-capable entry points share every step except
//! the completion call itself, so both produce identical state transitions
//! and context mutations for the same inputs.

mod error;
pub mod extract;
pub mod retry;

pub use error::DividerError;
pub use extract::DecompositionResult;
pub use retry::RetryPolicy;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::DividerConfig;
use crate::events::{EventSink, NullSink};
use crate::llm::{AsyncCompletionBackend, ChatCompletion, CompletionBackend, CompletionRequest};
use crate::task::{NodeId, TaskTree, TreeError};
use crate::tools::{StaticToolCatalog, ToolCatalog};

/// Outcome tag consumed by the surrounding workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of workflow state the divider reads and mutates.
///
/// `last_output` is overwritten, never appended, on every failure path;
/// callers must not assume history survives across attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowContext {
    /// The node currently being decomposed
    pub task: NodeId,

    /// Human-readable output of the prior workflow step
    pub last_output: String,
}

impl WorkflowContext {
    pub fn new(task: NodeId) -> Self {
        Self {
            task,
            last_output: String::new(),
        }
    }
}

/// Guard message written to the context when the depth ceiling is hit.
pub const DEPTH_GUARD_MESSAGE: &str = "failed: Max subtask depth reached";

const DEPTH_GUARD_REASON: &str = "Max subtask depth reached";
const NO_REASON: &str = "No reason generated.";

/// Decomposition orchestrator for one workflow node.
///
/// Holds the completion backend, the advertised tool catalog, the progress
/// sink, and an explicitly injected configuration. One divider call runs
/// exactly one in-flight completion at a time; attempts against a node are
/// strictly sequential.
pub struct TaskDivider<B> {
    backend: B,
    tools: Arc<dyn ToolCatalog>,
    sink: Arc<dyn EventSink>,
    config: DividerConfig,
}

impl<B> TaskDivider<B> {
    /// Create a divider with no advertised tools and no event sink.
    pub fn new(backend: B, config: DividerConfig) -> Self {
        Self {
            backend,
            tools: Arc::new(StaticToolCatalog::default()),
            sink: Arc::new(NullSink),
            config,
        }
    }

    /// Advertise a tool catalog to the model.
    pub fn with_tools(mut self, tools: Arc<dyn ToolCatalog>) -> Self {
        self.tools = tools;
        self
    }

    /// Report progress blocks to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &DividerConfig {
        &self.config
    }

    /// Depth ceiling check. Trips before any model invocation and is never
    /// retried: later re-invocations of this node would recurse forever
    /// otherwise.
    fn guard_depth(
        &self,
        tree: &TaskTree,
        ctx: &mut WorkflowContext,
    ) -> Result<Option<Outcome>, DividerError> {
        let node = tree.get(ctx.task).ok_or(TreeError::NodeNotFound(ctx.task))?;
        if node.depth() >= self.config.max_task_depth {
            debug!(
                task = node.task(),
                depth = node.depth(),
                max = self.config.max_task_depth,
                "depth guard tripped, not decomposing"
            );
            ctx.last_output = DEPTH_GUARD_MESSAGE.to_string();
            self.sink.send_block(json!({
                "parent_task": node.task(),
                "failed_reason": DEPTH_GUARD_REASON,
            }));
            return Ok(Some(Outcome::Failed));
        }
        Ok(None)
    }

    /// Assemble the four named model inputs for the current node.
    fn build_request(
        &self,
        tree: &TaskTree,
        ctx: &WorkflowContext,
    ) -> Result<CompletionRequest, DividerError> {
        let node = tree.get(ctx.task).ok_or(TreeError::NodeNotFound(ctx.task))?;
        let uplevel_tasks = match node.parent() {
            Some(parent) => tree.sibling_info(parent).collect(),
            None => Vec::new(),
        };
        Ok(CompletionRequest {
            parent_task: node.task().to_string(),
            uplevel_tasks,
            former_results: ctx.last_output.clone(),
            tools: self.tools.generate_prompt(),
        })
    }

    /// Apply one extracted result to the tree and context.
    fn settle(
        &self,
        tree: &mut TaskTree,
        ctx: &mut WorkflowContext,
        response: ChatCompletion,
    ) -> Result<Outcome, DividerError> {
        match extract::decompose(&response)? {
            DecompositionResult::Tasks(specs) => {
                // The extractor guarantees a non-empty list here.
                let children = tree.add_subtasks(ctx.task, &specs)?;
                self.sink.send_block(divided_block(tree, ctx.task, &children));
                info!(
                    task = %ctx.task,
                    subtasks = children.len(),
                    "task divided into subtasks"
                );
                Ok(Outcome::Success)
            }
            DecompositionResult::Failed(reason) => {
                let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
                debug!(%reason, "model declined to decompose");
                ctx.last_output = format!(
                    "failed: Subtask generation failed. Agent provided reason: {}",
                    reason
                );
                Ok(Outcome::Failed)
            }
        }
    }
}

impl<B: CompletionBackend> TaskDivider<B> {
    /// Decompose the context's task, blocking variant.
    ///
    /// # Errors
    /// - [`DividerError::InvalidGeneration`] once the retry policy is
    ///   exhausted; fatal to the node, not an [`Outcome::Failed`]
    /// - [`DividerError::Completion`] immediately on any backend failure
    /// - [`DividerError::Tree`] if the context points outside the tree
    pub fn divide(
        &self,
        tree: &mut TaskTree,
        ctx: &mut WorkflowContext,
    ) -> Result<Outcome, DividerError> {
        if let Some(outcome) = self.guard_depth(tree, ctx)? {
            return Ok(outcome);
        }
        self.config.retry.run(|| {
            let request = self.build_request(tree, ctx)?;
            let response = self
                .backend
                .complete(&request)
                .map_err(DividerError::Completion)?;
            self.settle(tree, ctx, response)
        })
    }
}

impl<B: AsyncCompletionBackend> TaskDivider<B> {
    /// Decompose the context's task, suspension-capable variant.
    ///
    /// Identical transitions and context mutations to [`divide`]; only the
    /// completion call suspends. The retry loop is inlined but shares its
    /// stop semantics through [`RetryPolicy::should_retry`].
    ///
    /// [`divide`]: TaskDivider::divide
    pub async fn divide_async(
        &self,
        tree: &mut TaskTree,
        ctx: &mut WorkflowContext,
    ) -> Result<Outcome, DividerError> {
        if let Some(outcome) = self.guard_depth(tree, ctx)? {
            return Ok(outcome);
        }
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match self.build_request(tree, ctx) {
                Ok(request) => match self.backend.complete(&request).await {
                    Ok(response) => self.settle(tree, ctx, response),
                    Err(error) => Err(DividerError::Completion(error)),
                },
                Err(error) => Err(error),
            };
            match result {
                Err(error) if self.config.retry.should_retry(attempt, started.elapsed(), &error) => {
                    warn!(attempt, "invalid generation from model, retrying");
                }
                other => return other,
            }
        }
    }
}

/// Progress block for a successful division: the parent task plus each new
/// child's text and `&`-joined milestones.
fn divided_block(tree: &TaskTree, parent: NodeId, children: &[NodeId]) -> serde_json::Value {
    let parent_task = tree.get(parent).map(|node| node.task()).unwrap_or_default();
    let children_tasks: Vec<serde_json::Value> = children
        .iter()
        .enumerate()
        .filter_map(|(idx, &child)| tree.get(child).map(|node| (idx, node)))
        .map(|(idx, node)| {
            json!({
                (format!("subtask_{}", idx)): node.task(),
                (format!("subtask_{} milestones", idx)): node.milestones().join(" & "),
            })
        })
        .collect();
    json!({
        "parent_task": parent_task,
        "children_tasks": children_tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::task::SubtaskSpec;
    use crate::tools::ToolSpec;

    const WEBSITE_PLAN: &str = r#"{"tasks": [{"task": "Design UI", "milestones": ["wireframe"]}, {"task": "Write backend", "milestones": ["API", "DB"]}]}"#;

    /// Backend that replays a script of responses and records what it saw.
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<ChatCompletion, String>>>,
        calls: AtomicUsize,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<ChatCompletion, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn replying(contents: &[&str]) -> Self {
            Self::new(
                contents
                    .iter()
                    .map(|content| Ok(ChatCompletion::from_text(*content)))
                    .collect(),
            )
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Option<CompletionRequest> {
            self.last_request.lock().unwrap().clone()
        }

        fn next(&self, request: &CompletionRequest) -> anyhow::Result<ChatCompletion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => panic!("backend called more often than scripted"),
            }
        }
    }

    impl CompletionBackend for ScriptedBackend {
        fn complete(&self, request: &CompletionRequest) -> anyhow::Result<ChatCompletion> {
            self.next(request)
        }
    }

    #[async_trait]
    impl AsyncCompletionBackend for ScriptedBackend {
        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<ChatCompletion> {
            self.next(request)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        blocks: Mutex<Vec<serde_json::Value>>,
    }

    impl RecordingSink {
        fn blocks(&self) -> Vec<serde_json::Value> {
            self.blocks.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn send_block(&self, block: serde_json::Value) {
            self.blocks.lock().unwrap().push(block);
        }
    }

    fn config(max_depth: u32, attempts: u32) -> DividerConfig {
        DividerConfig {
            max_task_depth: max_depth,
            retry: RetryPolicy {
                stop_after_delay: Duration::from_secs(3600),
                stop_after_attempt: attempts,
            },
        }
    }

    fn divider(
        backend: ScriptedBackend,
        cfg: DividerConfig,
    ) -> (TaskDivider<ScriptedBackend>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let divider = TaskDivider::new(backend, cfg).with_sink(sink.clone());
        (divider, sink)
    }

    #[test]
    fn test_success_grows_tree_in_proposal_order() {
        let (divider, sink) = divider(ScriptedBackend::replying(&[WEBSITE_PLAN]), config(5, 5));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let outcome = divider.divide(&mut tree, &mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(outcome.as_str(), "success");

        let children = tree.get(tree.root()).unwrap().children().to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(tree.get(children[0]).unwrap().task(), "Design UI");
        assert_eq!(tree.get(children[1]).unwrap().task(), "Write backend");
        for &child in &children {
            assert_eq!(tree.get(child).unwrap().depth(), 1);
        }

        // Context identity is preserved; last_output is untouched on success.
        assert_eq!(ctx.task, tree.root());
        assert_eq!(ctx.last_output, "");

        let blocks = sink.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["parent_task"], "Build a website");
        assert_eq!(blocks[0]["children_tasks"][1]["subtask_1 milestones"], "API & DB");
    }

    #[test]
    fn test_success_with_fenced_block() {
        let fenced = format!("Sure, here is the plan:\n```json\n{}\n```", WEBSITE_PLAN);
        let (divider, _) = divider(ScriptedBackend::replying(&[&fenced]), config(5, 5));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        assert_eq!(divider.divide(&mut tree, &mut ctx).unwrap(), Outcome::Success);
        assert_eq!(tree.get(tree.root()).unwrap().children().len(), 2);
    }

    #[test]
    fn test_depth_guard_blocks_without_model_call() {
        let backend = ScriptedBackend::replying(&[]);
        let (divider, sink) = divider(backend, config(0, 5));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let outcome = divider.divide(&mut tree, &mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(divider.backend.calls(), 0);
        assert_eq!(ctx.last_output, DEPTH_GUARD_MESSAGE);

        let blocks = sink.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["failed_reason"], "Max subtask depth reached");
    }

    #[test]
    fn test_model_decline_sets_reason_without_retry() {
        let (divider, sink) = divider(
            ScriptedBackend::replying(&[r#"{"failed_reason": "ambiguous scope"}"#]),
            config(5, 5),
        );
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let outcome = divider.divide(&mut tree, &mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(divider.backend.calls(), 1);
        assert!(ctx.last_output.contains("ambiguous scope"));
        assert!(tree.get(tree.root()).unwrap().is_leaf());
        assert!(sink.blocks().is_empty());
    }

    #[test]
    fn test_empty_decline_reason_uses_fallback_phrase() {
        let (divider, _) = divider(
            ScriptedBackend::replying(&[r#"{"failed_reason": ""}"#]),
            config(5, 5),
        );
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        assert_eq!(divider.divide(&mut tree, &mut ctx).unwrap(), Outcome::Failed);
        assert!(ctx.last_output.contains("No reason generated."));
    }

    #[test]
    fn test_invalid_generation_retried_then_fatal() {
        let garbage = ["not json", "still not json", "nope"];
        let (divider, sink) = divider(ScriptedBackend::replying(&garbage), config(5, 3));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let err = divider.divide(&mut tree, &mut ctx).unwrap_err();
        assert!(err.is_invalid_generation());
        assert_eq!(divider.backend.calls(), 3);
        // Tree unchanged, no progress reported.
        assert_eq!(tree.len(), 1);
        assert!(sink.blocks().is_empty());
    }

    #[test]
    fn test_invalid_then_valid_succeeds_within_budget() {
        let (divider, _) = divider(
            ScriptedBackend::replying(&["garbage", WEBSITE_PLAN]),
            config(5, 2),
        );
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        assert_eq!(divider.divide(&mut tree, &mut ctx).unwrap(), Outcome::Success);
        assert_eq!(divider.backend.calls(), 2);
    }

    #[test]
    fn test_transport_error_propagates_unretried() {
        let backend = ScriptedBackend::new(vec![Err("connection reset".to_string())]);
        let (divider, _) = divider(backend, config(5, 5));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let err = divider.divide(&mut tree, &mut ctx).unwrap_err();
        assert!(matches!(err, DividerError::Completion(_)));
        assert_eq!(divider.backend.calls(), 1);
    }

    #[test]
    fn test_request_carries_all_four_named_inputs() {
        let mut tree = TaskTree::new("Build a website");
        let level1 = tree
            .add_subtasks(
                tree.root(),
                &[
                    SubtaskSpec::new("Design UI"),
                    SubtaskSpec::new("Write backend"),
                ],
            )
            .unwrap();
        let level2 = tree
            .add_subtasks(level1[0], &[SubtaskSpec::new("Pick a color scheme")])
            .unwrap();

        let backend = ScriptedBackend::replying(&[r#"{"failed_reason": "fine as is"}"#]);
        let tools = Arc::new(StaticToolCatalog::new(vec![ToolSpec::new(
            "web_search",
            "Search the web",
        )]));
        let divider = TaskDivider::new(backend, config(5, 5)).with_tools(tools);

        let mut ctx = WorkflowContext::new(level2[0]);
        ctx.last_output = "previous step output".to_string();
        divider.divide(&mut tree, &mut ctx).unwrap();

        let request = divider.backend.last_request().unwrap();
        assert_eq!(request.parent_task, "Pick a color scheme");
        // Uplevel context comes from the parent's level.
        let uplevel: Vec<&str> = request
            .uplevel_tasks
            .iter()
            .map(|s| s.task.as_str())
            .collect();
        assert_eq!(uplevel, vec!["Design UI", "Write backend"]);
        assert_eq!(request.former_results, "previous step output");
        assert!(request.tools.contains("web_search"));
    }

    #[test]
    fn test_unknown_context_node_is_a_tree_error() {
        let (divider, _) = divider(ScriptedBackend::replying(&[]), config(5, 5));
        let mut tree = TaskTree::new("Build a website");
        let orphan = {
            let mut other = TaskTree::new("other");
            other
                .add_subtasks(other.root(), &[SubtaskSpec::new("stray")])
                .unwrap()[0]
        };
        let mut ctx = WorkflowContext::new(orphan);

        let err = divider.divide(&mut tree, &mut ctx).unwrap_err();
        assert!(matches!(err, DividerError::Tree(TreeError::NodeNotFound(_))));
    }

    #[tokio::test]
    async fn test_async_success_matches_blocking_variant() {
        let (divider, sink) = divider(ScriptedBackend::replying(&[WEBSITE_PLAN]), config(5, 5));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let outcome = divider.divide_async(&mut tree, &mut ctx).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(tree.get(tree.root()).unwrap().children().len(), 2);
        assert_eq!(sink.blocks().len(), 1);
    }

    #[tokio::test]
    async fn test_async_depth_guard_also_reports_block() {
        let (divider, sink) = divider(ScriptedBackend::replying(&[]), config(0, 5));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let outcome = divider.divide_async(&mut tree, &mut ctx).await.unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(divider.backend.calls(), 0);
        assert_eq!(ctx.last_output, DEPTH_GUARD_MESSAGE);
        assert_eq!(sink.blocks().len(), 1);
    }

    #[tokio::test]
    async fn test_async_retry_exhaustion_is_fatal() {
        let garbage = ["%%", "%%", "%%", "%%"];
        let (divider, _) = divider(ScriptedBackend::replying(&garbage), config(5, 4));
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let err = divider.divide_async(&mut tree, &mut ctx).await.unwrap_err();
        assert!(err.is_invalid_generation());
        assert_eq!(divider.backend.calls(), 4);
        assert_eq!(tree.len(), 1);
    }

    #[tokio::test]
    async fn test_async_decline_matches_blocking_variant() {
        let (divider, _) = divider(
            ScriptedBackend::replying(&[r#"{"failed_reason": "ambiguous scope"}"#]),
            config(5, 5),
        );
        let mut tree = TaskTree::new("Build a website");
        let mut ctx = WorkflowContext::new(tree.root());

        let outcome = divider.divide_async(&mut tree, &mut ctx).await.unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert!(ctx.last_output.contains("ambiguous scope"));
    }
}
