//! cs-mcp: code-index tool provider over MCP
//!
//! Connects to MCP servers, discovers their tools and exposes them through
//! the cs-core Tool trait.

pub mod adapter;
pub mod client;
pub mod config;
pub mod registry;

pub use adapter::McpToolAdapter;
pub use client::{CallOutput, McpClient, McpTool};
pub use config::{CODE_INDEX_SERVER, McpServerConfig, McpServersConfig, ServerTransport};
pub use registry::{McpRegistry, initialize_mcp_tools, servers_from_config};
