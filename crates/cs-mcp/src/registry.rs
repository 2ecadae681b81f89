//! MCP Registry
//!
//! Connects to the configured servers at start-up and registers every
//! discovered tool with a [`ToolManager`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use cs_core::config::McpConfig;
use cs_core::{Error, Result, Tool, ToolManager};

use crate::client::McpClient;
use crate::config::{McpServerConfig, McpServersConfig, ServerTransport};
use crate::adapter::McpToolAdapter;

/// Registry for managing all MCP clients
pub struct McpRegistry {
    /// Connected MCP clients
    clients: Vec<Arc<McpClient>>,
}

impl McpRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Connect to a single MCP server
    async fn connect_server(server: &McpServerConfig, timeout: Duration) -> Result<McpClient> {
        let transport = server.transport()?;
        info!(server_name = %server.name, ?transport, "Connecting to MCP server");

        let connect = async {
            match transport {
                ServerTransport::Url(url) => McpClient::connect_url(url).await,
                ServerTransport::Command(command) => McpClient::connect(command, &server.env).await,
            }
        };

        let client = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))
            .and_then(|result| result)
            .map_err(|e| {
                error!(server_name = %server.name, error = %e, "Failed to connect to MCP server");
                e
            })?;

        Ok(client.with_call_timeout(timeout))
    }

    /// Connect to all enabled servers and register their tools.
    ///
    /// Servers that fail to connect or list tools are skipped. Returns
    /// `None` when no server could be used.
    pub async fn initialize(
        config: &McpServersConfig,
        call_timeout: Duration,
        tool_manager: &mut ToolManager,
    ) -> Result<Option<Self>> {
        let enabled_servers = config.enabled_servers();

        if enabled_servers.is_empty() {
            info!("No MCP servers configured");
            return Ok(None);
        }

        let mut registry = Self::new();
        let mut total_tools = 0;

        for server_config in enabled_servers {
            let client = match Self::connect_server(server_config, call_timeout).await {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    warn!(
                        server_name = %server_config.name,
                        error = %e,
                        "Skipping MCP server due to connection error"
                    );
                    continue;
                }
            };

            match client.list_tools().await {
                Ok(tools) => {
                    info!(
                        server_name = %server_config.name,
                        tool_count = tools.len(),
                        "Discovered MCP tools"
                    );

                    for tool in tools {
                        let adapter = Arc::new(McpToolAdapter::new(Arc::clone(&client), tool));
                        let tool_name = adapter.name().to_string();
                        if tool_manager.try_register(adapter) {
                            total_tools += 1;
                            info!(
                                server_name = %server_config.name,
                                %tool_name,
                                "Registered MCP tool"
                            );
                        } else {
                            warn!(
                                server_name = %server_config.name,
                                %tool_name,
                                "Skipping MCP tool whose name is already registered"
                            );
                        }
                    }

                    registry.clients.push(client);
                }
                Err(e) => {
                    warn!(
                        server_name = %server_config.name,
                        error = %e,
                        "Failed to list tools from MCP server"
                    );
                }
            }
        }

        if registry.clients.is_empty() {
            warn!("No MCP servers connected successfully");
            Ok(None)
        } else {
            info!(
                server_count = registry.clients.len(),
                total_tools,
                "MCP registry initialized"
            );
            Ok(Some(registry))
        }
    }

    /// Gracefully shutdown all MCP clients
    ///
    /// Tools holding a client must be dropped first.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down MCP registry");

        for client in self.clients {
            match Arc::try_unwrap(client) {
                Ok(client) => {
                    if let Err(e) = client.shutdown().await {
                        warn!(error = %e, "Failed to shutdown MCP client");
                    }
                }
                Err(arc_client) => {
                    warn!(
                        server_name = arc_client.server_name(),
                        "MCP client still has references, skipping graceful shutdown"
                    );
                }
            }
        }

        info!("MCP registry shutdown complete");
        Ok(())
    }

    /// Get the number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for McpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Server list selected by the application configuration.
///
/// A configured server list file wins; otherwise the code-index server is
/// used alone.
pub fn servers_from_config(config: &McpConfig) -> Result<McpServersConfig> {
    match &config.config_path {
        Some(path) => {
            info!(path = %path, "Loading MCP configuration from file");
            McpServersConfig::from_json_file(path)
        }
        None => Ok(McpServersConfig::with_code_index(&config.code_index_url)),
    }
}

/// Connect the configured code-index providers and register their tools
///
/// # Returns
/// The registry on success (for shutdown purposes), or None
pub async fn initialize_mcp_tools(
    config: &McpConfig,
    tool_manager: &mut ToolManager,
) -> Result<Option<McpRegistry>> {
    if !config.enabled {
        info!("MCP integration disabled");
        return Ok(None);
    }

    let servers = servers_from_config(config)?;
    McpRegistry::initialize(
        &servers,
        Duration::from_secs(config.call_timeout_secs),
        tool_manager,
    )
    .await
}
