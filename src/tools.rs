//! Tool-capability advertisement.
//!
//! The divider tells the model which tools the surrounding workflow can run,
//! so proposed subtasks stay within reach of the executor. Only the
//! serialized description crosses this boundary; invoking tools is the host
//! system's business.

use serde::{Deserialize, Serialize};

/// Source of the serialized tool-capability description injected into the
/// model prompt.
pub trait ToolCatalog: Send + Sync {
    /// Render the available tools as prompt text.
    fn generate_prompt(&self) -> String;
}

/// Description of a single tool capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,

    /// JSON schema of the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Create a tool spec with an empty parameter schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Catalog backed by a fixed list of tool specs.
#[derive(Debug, Clone, Default)]
pub struct StaticToolCatalog {
    tools: Vec<ToolSpec>,
}

impl StaticToolCatalog {
    pub fn new(tools: Vec<ToolSpec>) -> Self {
        Self { tools }
    }
}

impl ToolCatalog for StaticToolCatalog {
    fn generate_prompt(&self) -> String {
        // Serializing plain strings and a Value cannot fail in practice;
        // fall back to an empty list rather than poisoning the prompt.
        serde_json::to_string_pretty(&self.tools).unwrap_or_else(|_| "[]".to_string())
    }
}
