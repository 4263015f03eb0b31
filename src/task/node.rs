//! Task node data and the wire-level subtask shape.
//!
//! # Invariants
//! - `depth == 0` iff the node is the tree root
//! - A node's depth always equals its parent's depth + 1
//! - `children` is append-only: entries are never removed or reordered

use serde::{Deserialize, Serialize};

use super::tree::NodeId;

/// One proposed subtask as emitted by the model.
///
/// This is the wire contract: a decomposition payload carries a non-empty
/// array of these under the `tasks` key. `milestones` may be omitted by the
/// model and defaults to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    /// Description of the subtask
    pub task: String,

    /// Completion milestones, in the order the model proposed them
    #[serde(default)]
    pub milestones: Vec<String>,
}

impl SubtaskSpec {
    /// Create a subtask spec with no milestones.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            milestones: Vec::new(),
        }
    }

    /// Attach milestones to the spec.
    pub fn with_milestones(mut self, milestones: Vec<String>) -> Self {
        self.milestones = milestones;
        self
    }
}

/// Summary of a task at the same tree level, given to the model as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingSummary {
    pub task: String,
    pub milestones: Vec<String>,
}

/// A single task in the decomposition tree.
///
/// Nodes live in a [`TaskTree`](super::TaskTree) arena and refer to their
/// parent and children by [`NodeId`]. The parent link is a plain index, not an
/// owning reference, so traversal never fights the ownership of the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    task: String,
    milestones: Vec<String>,
    depth: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TaskNode {
    pub(super) fn new(
        task: String,
        milestones: Vec<String>,
        depth: u32,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            task,
            milestones,
            depth,
            parent,
            children: Vec::new(),
        }
    }

    /// The task text.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Completion milestones, in proposal order.
    pub fn milestones(&self) -> &[String] {
        &self.milestones
    }

    /// Distance from the root (root is 0). O(1).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The parent node, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in the order they were appended.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether this node has been decomposed already.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(super) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Summary of this node for sibling context.
    pub fn summary(&self) -> SiblingSummary {
        SiblingSummary {
            task: self.task.clone(),
            milestones: self.milestones.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_spec_milestones_default_to_empty() {
        let spec: SubtaskSpec = serde_json::from_str(r#"{"task": "Design UI"}"#).unwrap();
        assert_eq!(spec.task, "Design UI");
        assert!(spec.milestones.is_empty());
    }

    #[test]
    fn test_subtask_spec_builder() {
        let spec = SubtaskSpec::new("Write backend")
            .with_milestones(vec!["API".to_string(), "DB".to_string()]);
        assert_eq!(spec.milestones, vec!["API", "DB"]);
    }
}
