//! Task tree module - the decomposition tree and its node type.
//!
//! Designed so the divider can mutate the tree without locking: the tree is
//! only ever touched through `&mut` by the divider call that owns the node,
//! and attempts against one node are strictly sequential.

mod node;
mod tree;

pub use node::{SiblingSummary, SubtaskSpec, TaskNode};
pub use tree::{NodeId, TaskTree, TreeError};
