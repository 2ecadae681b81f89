//! MCP Client implementation
//!
//! Talks to MCP servers with rmcp over streamable HTTP or a child process.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use rmcp::{
    model::{CallToolRequestParams, Tool},
    service::{RoleClient, RunningService, ServiceExt},
    transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess},
};
use serde_json::Value as JsonValue;
use tokio::process::Command;
use tracing::debug;

use cs_core::{Error, Result};

/// Default timeout for one remote call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// MCP Tool information
#[derive(Debug, Clone, PartialEq)]
pub struct McpTool {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for input parameters
    pub input_schema: JsonValue,
    /// JSON schema of structured output, when the server declares one
    pub output_schema: Option<JsonValue>,
}

impl From<Tool> for McpTool {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.clone().unwrap_or_default().to_string(),
            input_schema: serde_json::to_value(&tool.input_schema).unwrap_or(JsonValue::Null),
            output_schema: tool
                .output_schema
                .as_ref()
                .and_then(|schema| serde_json::to_value(schema).ok()),
        }
    }
}

/// Text output of a tool call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutput {
    pub text: String,
    /// The server reported the call as failed
    pub is_error: bool,
}

/// Run `fut` with a deadline, mapping expiry to [`Error::Timeout`]
async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| Error::Timeout(deadline.as_secs()))?
}

/// MCP Client for communicating with MCP servers
pub struct McpClient {
    /// Inner rmcp running service
    service: RunningService<RoleClient, ()>,
    /// Server name for identification
    server_name: String,
    call_timeout: Duration,
}

impl McpClient {
    /// Connect to an MCP server via child process
    ///
    /// # Example
    /// ```ignore
    /// let client = McpClient::connect("uvx mcp-server-git", &HashMap::new()).await?;
    /// ```
    pub async fn connect(command: &str, env: &HashMap<String, String>) -> Result<Self> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            return Err(Error::Config("Empty command".into()));
        };

        let transport = TokioChildProcess::new(Command::new(cmd).configure(|c| {
            c.args(args);
            c.envs(env);
        }))
        .map_err(|e| Error::Mcp(format!("Failed to create transport: {}", e)))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::Mcp(format!("Failed to connect: {}", e)))?;

        Ok(Self::from_service(service))
    }

    /// Connect to an MCP server over streamable HTTP
    ///
    /// # Example
    /// ```ignore
    /// let client = McpClient::connect_url("https://mcp.deepwiki.com/mcp").await?;
    /// ```
    pub async fn connect_url(url: &str) -> Result<Self> {
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::Mcp(format!("Failed to connect to {}: {}", url, e)))?;

        Ok(Self::from_service(service))
    }

    fn from_service(service: RunningService<RoleClient, ()>) -> Self {
        let server_name = service
            .peer_info()
            .map(|info| info.server_info.name.clone().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            service,
            server_name,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the timeout applied to every remote call
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Get the server name
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// List available tools from the MCP server
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let result = with_deadline(self.call_timeout, async {
            self.service
                .list_tools(Default::default())
                .await
                .map_err(|e| Error::Mcp(format!("Failed to list tools: {}", e)))
        })
        .await?;

        Ok(result.tools.into_iter().map(McpTool::from).collect())
    }

    /// Call a tool on the MCP server
    ///
    /// Transport failures and timeouts are errors; a failure reported by the
    /// tool itself comes back with `is_error` set.
    pub async fn call_tool(&self, name: &str, args: JsonValue) -> Result<CallOutput> {
        let arguments = match args {
            JsonValue::Object(map) => Some(map),
            JsonValue::Null => None,
            other => {
                return Err(Error::InvalidArguments(format!(
                    "arguments for '{}' must be an object, got {}",
                    name, other
                )));
            }
        };

        debug!(server = %self.server_name, tool = name, "Calling MCP tool");

        let result = with_deadline(self.call_timeout, async {
            self.service
                .call_tool(CallToolRequestParams {
                    meta: None,
                    name: name.to_string().into(),
                    arguments,
                    task: None,
                })
                .await
                .map_err(|e| Error::Mcp(format!("Tool call failed: {}", e)))
        })
        .await?;

        let text = result
            .content
            .into_iter()
            .filter_map(|c| {
                if let rmcp::model::RawContent::Text(text) = c.raw {
                    Some(text.text)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(CallOutput {
            text,
            is_error: result.is_error.unwrap_or(false),
        })
    }

    /// Gracefully close the connection
    pub async fn shutdown(self) -> Result<()> {
        self.service
            .cancel()
            .await
            .map_err(|e| Error::Mcp(format!("Shutdown failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let err = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout(0)));
    }

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let value = with_deadline(Duration::from_secs(1), async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let result = McpClient::connect("   ", &HashMap::new()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_mcp_error() {
        let result = McpClient::connect("cluestack-no-such-mcp-server --stdio", &HashMap::new()).await;
        assert!(matches!(result, Err(Error::Mcp(_))));
    }
}
