//! Divider error taxonomy.

use thiserror::Error;

use crate::task::TreeError;

/// Errors surfaced by a divider call.
///
/// Graceful decomposition failures (depth guard, model decline) are *not*
/// errors - they come back as [`Outcome::Failed`](super::Outcome). An `Err`
/// from the divider is fatal to the node's execution.
#[derive(Debug, Error)]
pub enum DividerError {
    /// The model response could not be parsed into a recognized
    /// success/failure shape. The only error class the retry loop
    /// intercepts.
    #[error("LLM generation is not valid")]
    InvalidGeneration,

    /// The completion collaborator failed below the semantic layer.
    /// Propagates immediately, never retried.
    #[error("Completion backend error: {0}")]
    Completion(anyhow::Error),

    /// The task tree rejected a mutation.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl DividerError {
    /// Whether this is the retried invalid-generation signal.
    pub fn is_invalid_generation(&self) -> bool {
        matches!(self, DividerError::InvalidGeneration)
    }
}
