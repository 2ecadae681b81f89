//! Tool trait definition
//!
//! Defines the core trait for capabilities an agent can invoke through
//! model tool calls.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::Result;

/// Tool execution result
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Output string from tool execution
    pub output: String,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }

    /// Serialize a value as the successful output
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Self::success(serde_json::to_string(value)?))
    }
}

/// A remote capability wrapped as a callable unit
///
/// Implementations perform exactly one remote call per `execute`. Failures
/// are returned as typed errors; the calling agent decides whether they are
/// recoverable.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name (used in tool definitions)
    fn name(&self) -> &str;

    /// Get the tool description (shown to the model when selecting tools)
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's input parameters
    fn input_schema(&self) -> JsonValue;

    /// JSON schema of a successful output, when the tool declares one
    fn output_schema(&self) -> Option<JsonValue> {
        None
    }

    /// Execute the tool with the given input
    async fn execute(&self, input: JsonValue) -> Result<ToolResult>;
}
