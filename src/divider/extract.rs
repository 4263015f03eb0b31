//! Result extraction from raw model output.
//!
//! The model answers in one of two accepted encodings: a fenced ```json
//! block embedded in prose, or a bare JSON payload with no surrounding text.
//! Anything that fails at any step - missing choices, missing content, no
//! parseable JSON, a non-object payload, a malformed `tasks` array, or
//! neither recognized key - collapses into the single
//! [`DividerError::InvalidGeneration`] signal with no partial result, so the
//! retry loop treats every unusable response uniformly.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::error::DividerError;
use crate::llm::ChatCompletion;
use crate::task::SubtaskSpec;

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s+(.*?)\s+```").expect("fenced-block pattern"));

/// A validated decomposition answer.
///
/// `Tasks` is guaranteed non-empty; an empty `tasks` array never reaches the
/// success path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompositionResult {
    /// The model proposed subtasks, in its own order.
    Tasks(Vec<SubtaskSpec>),

    /// The model explicitly declined to decompose. `None` when it gave an
    /// empty reason.
    Failed(Option<String>),
}

/// Parse a raw completion into a [`DecompositionResult`].
///
/// # Errors
/// [`DividerError::InvalidGeneration`] for every unusable response shape.
pub fn decompose(response: &ChatCompletion) -> Result<DecompositionResult, DividerError> {
    decode(&extract_mapping(response)?)
}

/// Locate and parse the structured payload inside the response content.
///
/// Prefers the first fenced ```json block; falls back to treating the whole
/// content as JSON. The payload must be a JSON object.
fn extract_mapping(response: &ChatCompletion) -> Result<Map<String, Value>, DividerError> {
    let content = response
        .first_content()
        .ok_or(DividerError::InvalidGeneration)?;

    let raw = match JSON_BLOCK.captures(content).and_then(|caps| caps.get(1)) {
        Some(block) => block.as_str(),
        None => content,
    };

    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|_| DividerError::InvalidGeneration)?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DividerError::InvalidGeneration),
    }
}

/// Strict decode of the key-value mapping into the result union.
fn decode(mapping: &Map<String, Value>) -> Result<DecompositionResult, DividerError> {
    if let Some(tasks) = mapping.get("tasks") {
        let specs: Vec<SubtaskSpec> =
            serde_json::from_value(tasks.clone()).map_err(|_| DividerError::InvalidGeneration)?;
        if !specs.is_empty() {
            return Ok(DecompositionResult::Tasks(specs));
        }
        // An empty tasks array is not a success trigger; fall through to the
        // decline check.
    }

    match mapping.get("failed_reason") {
        Some(Value::String(reason)) if !reason.is_empty() => {
            Ok(DecompositionResult::Failed(Some(reason.clone())))
        }
        Some(Value::String(_)) => Ok(DecompositionResult::Failed(None)),
        _ => Err(DividerError::InvalidGeneration),
    }
}
