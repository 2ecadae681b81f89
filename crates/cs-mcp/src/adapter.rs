//! MCP Tool Adapter
//!
//! Exposes a discovered MCP tool through the cs-core [`Tool`] trait.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use cs_core::{Result, Tool, ToolResult};

use crate::client::{McpClient, McpTool};

/// Adapter to make MCP tools compatible with the cs-core Tool trait
pub struct McpToolAdapter {
    client: Arc<McpClient>,
    tool: McpTool,
}

impl McpToolAdapter {
    /// Create a new adapter from an MCP client and tool definition
    pub fn new(client: Arc<McpClient>, tool: McpTool) -> Self {
        Self { client, tool }
    }

    /// Name of the server providing this tool
    pub fn server_name(&self) -> &str {
        self.client.server_name()
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        &self.tool.description
    }

    fn input_schema(&self) -> JsonValue {
        self.tool.input_schema.clone()
    }

    fn output_schema(&self) -> Option<JsonValue> {
        self.tool.output_schema.clone()
    }

    /// Transport failures and timeouts are returned as errors; failures
    /// reported by the tool become error results.
    async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
        let output = self.client.call_tool(&self.tool.name, input).await?;
        if output.is_error {
            Ok(ToolResult::error(output.text))
        } else {
            Ok(ToolResult::success(output.text))
        }
    }
}
