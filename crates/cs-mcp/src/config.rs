//! MCP server list
//!
//! Servers are reached either over streamable HTTP (`url`) or by launching a
//! child process speaking stdio (`command`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use cs_core::{Error, Result};

/// Name of the server registered when no server list is configured
pub const CODE_INDEX_SERVER: &str = "code-index";

/// How to reach a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTransport<'a> {
    Url(&'a str),
    Command(&'a str),
}

/// MCP Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Server name (used for identification)
    pub name: String,

    /// Streamable HTTP endpoint, e.g. `https://mcp.deepwiki.com/mcp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Command starting a stdio server, e.g. `uvx mcp-server-git`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Environment variables passed to a launched server
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Whether this server is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl McpServerConfig {
    /// Server reached over streamable HTTP
    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            command: None,
            env: HashMap::new(),
            enabled: true,
        }
    }

    /// Server launched as a child process
    pub fn command(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            command: Some(command.into()),
            env: HashMap::new(),
            enabled: true,
        }
    }

    /// Transport of this server; exactly one of `url` and `command` must be set
    pub fn transport(&self) -> Result<ServerTransport<'_>> {
        let url = self.url.as_deref().filter(|u| !u.trim().is_empty());
        let command = self.command.as_deref().filter(|c| !c.trim().is_empty());

        match (url, command) {
            (Some(url), None) => Ok(ServerTransport::Url(url)),
            (None, Some(command)) => Ok(ServerTransport::Command(command)),
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "MCP server '{}' sets both url and command",
                self.name
            ))),
            (None, None) => Err(Error::Config(format!(
                "MCP server '{}' needs a url or a command",
                self.name
            ))),
        }
    }
}

/// MCP configuration containing all server definitions
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpServersConfig {
    /// List of MCP servers to connect
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

impl McpServersConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read MCP config: {}", e)))?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid MCP config JSON: {}", e)))
    }

    /// Get only enabled servers
    pub fn enabled_servers(&self) -> Vec<&McpServerConfig> {
        self.servers.iter().filter(|s| s.enabled).collect()
    }

    /// Add a server configuration
    pub fn add_server(&mut self, config: McpServerConfig) {
        self.servers.push(config);
    }

    /// Configuration with only the code-index server at `url`
    pub fn with_code_index(url: impl Into<String>) -> Self {
        Self {
            servers: vec![McpServerConfig::url(CODE_INDEX_SERVER, url)],
        }
    }
}
