//! Arena-backed task tree.
//!
//! The tree owns every node in a flat arena; nodes refer to each other by
//! index. This keeps parent back-references non-owning (an id, not a pointer)
//! while the arena retains exclusive ownership of all nodes: dropping the
//! tree drops every task in it.
//!
//! # Invariants
//! - Node 0 is the root and has depth 0
//! - Every child's depth equals its parent's depth + 1
//! - Children are only ever appended, so the tree is acyclic by construction

use serde::{Deserialize, Serialize};

use super::node::{SiblingSummary, SubtaskSpec, TaskNode};

/// Index of a node within a [`TaskTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The decomposition tree for one top-level task.
///
/// # Lifecycle
/// The root is created once per top-level task. Children are created only by
/// a successful decomposition step via [`add_subtasks`](Self::add_subtasks),
/// appended in proposal order, and never removed or re-parented afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTree {
    nodes: Vec<TaskNode>,
}

impl TaskTree {
    /// Create a tree holding only the root task at depth 0.
    pub fn new(root_task: impl Into<String>) -> Self {
        Self {
            nodes: vec![TaskNode::new(root_task.into(), Vec::new(), 0, None)],
        }
    }

    /// The root node's id.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Look up a node by id.
    pub fn get(&self, id: NodeId) -> Option<&TaskNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append one child per spec, in input order.
    ///
    /// Each child gets `parent`'s depth + 1 and its milestones copied
    /// verbatim from the spec.
    ///
    /// # Errors
    /// - [`TreeError::EmptySubtasks`] if `specs` is empty
    /// - [`TreeError::NodeNotFound`] if `parent` is not in the tree
    pub fn add_subtasks(
        &mut self,
        parent: NodeId,
        specs: &[SubtaskSpec],
    ) -> Result<Vec<NodeId>, TreeError> {
        if specs.is_empty() {
            return Err(TreeError::EmptySubtasks);
        }
        let parent_depth = self
            .get(parent)
            .ok_or(TreeError::NodeNotFound(parent))?
            .depth();

        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = NodeId(self.nodes.len());
            self.nodes.push(TaskNode::new(
                spec.task.clone(),
                spec.milestones.clone(),
                parent_depth + 1,
                Some(parent),
            ));
            self.nodes[parent.0].push_child(id);
            created.push(id);
        }
        Ok(created)
    }

    /// Summaries of the tasks at `id`'s level: all children of its parent,
    /// in insertion order.
    ///
    /// The iterator is lazy and finite; calling this again restarts it.
    /// Empty when `id` is the root (no parent) or unknown.
    pub fn sibling_info(&self, id: NodeId) -> impl Iterator<Item = SiblingSummary> + '_ {
        let siblings: &[NodeId] = self
            .get(id)
            .and_then(|node| node.parent())
            .and_then(|parent| self.get(parent))
            .map(|parent| parent.children())
            .unwrap_or(&[]);

        siblings
            .iter()
            .filter_map(move |&sibling| self.get(sibling))
            .map(TaskNode::summary)
    }
}

/// Errors from task tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Subtask list cannot be empty")]
    EmptySubtasks,

    #[error("No node {0} in the task tree")]
    NodeNotFound(NodeId),
}
