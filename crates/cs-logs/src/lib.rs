//! cs-logs: log backend tools for Cluestack
//!
//! A Loki `query_range` client plus the two tools the logs specialist uses:
//! LogQL generation from a natural-language question and log fetching.

pub mod client;
pub mod error;
pub mod prompts;
pub mod tools;
pub mod window;

use std::sync::Arc;

use cs_core::llm::LanguageModel;
use cs_core::tool::ToolManager;

pub use client::{LokiClient, parse_query_response};
pub use error::{LogsError, Result};
pub use tools::{FETCH_TOOL_NAME, LOGQL_TOOL_NAME, LogFetchTool, LogQLQuery, LogQlGeneratorTool};
pub use window::{QueryWindow, TIME_FORMAT};

/// Toolset of the logs specialist
pub fn log_tools(
    model: Arc<dyn LanguageModel>,
    client: Arc<LokiClient>,
    schema_corrections: usize,
) -> ToolManager {
    ToolManager::new()
        .with(Arc::new(
            LogQlGeneratorTool::new(model).with_schema_corrections(schema_corrections),
        ))
        .with(Arc::new(LogFetchTool::new(client)))
}
