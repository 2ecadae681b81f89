//! Error types for cs-core

use thiserror::Error;

/// Main error type for cs-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// Timeout, refused connection or non-2xx response from a remote backend
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Error reported in-band by a backend inside a successful response
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Output for '{schema}' violates its schema: {reason}")]
    Schema { schema: String, reason: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a tool failure should end the owning agent's run instead of
    /// being reported back to the model as an observation.
    pub fn is_fatal_for_tool(&self) -> bool {
        matches!(self, Self::MissingCredentials(_) | Self::Config(_))
    }
}

/// Result type alias for cs-core
pub type Result<T> = std::result::Result<T, Error>;
