//! Model-completion collaborator boundary.
//!
//! This module provides a trait-based abstraction over the completion
//! transport. The divider never talks to a provider directly: it hands a
//! [`CompletionRequest`] to a backend and gets back the provider-shaped
//! [`ChatCompletion`] payload, `{choices: [{message: {content}}]}`.
//!
//! Prompt templating, request dispatch, and transport-level retry all live
//! behind these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::SiblingSummary;

/// Named inputs for one decomposition completion.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Text of the task being decomposed
    pub parent_task: String,

    /// Summaries of tasks at the parent's level, empty for the root
    pub uplevel_tasks: Vec<SiblingSummary>,

    /// The workflow's last output, so the model sees the prior step's outcome
    pub former_results: String,

    /// Serialized description of the available tool capabilities
    pub tools: String,
}

/// Raw response payload from a completion call.
///
/// Fields the provider may omit deserialize to their defaults; the extractor
/// treats any missing piece as an invalid generation rather than a panic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// The message within a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    /// Wrap plain text as a single-choice completion (useful for backends
    /// and tests).
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(content.into()),
                },
            }],
        }
    }

    /// Content of the first choice, if present.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Blocking completion backend.
pub trait CompletionBackend: Send + Sync {
    /// Run one completion, blocking the calling thread.
    ///
    /// # Errors
    /// Transport failures of any kind. The divider propagates them
    /// immediately without retry.
    fn complete(&self, request: &CompletionRequest) -> anyhow::Result<ChatCompletion>;
}

/// Suspension-capable completion backend.
///
/// Semantically identical to [`CompletionBackend`]; the only difference is
/// that the call suspends the task instead of blocking the thread.
#[async_trait]
pub trait AsyncCompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<ChatCompletion>;
}
