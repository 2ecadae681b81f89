//! cs-core: Cluestack core library
//!
//! LLM client, structured output, tool system, shared conversation state
//! and the supervisor/specialist agents that investigate incidents.

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod state;
pub mod tool;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use agents::{
    AgentOutput, OutcomeStatus, RunResult, Specialist, SpecialistAgent, SpecialistReport,
    SpecialistStatus, Supervisor, SupervisorOutcome,
};
pub use config::{
    AgentsConfig, BasicCredentials, Config, LlmConfig, LlmProvider, LogsConfig, McpConfig,
    SecureString,
};
pub use error::{Error, Result};
pub use llm::{
    LanguageModel, LlmClient, Message, MessageContent, StructuredOutput, ToolDefinition,
    complete_structured,
};
pub use observability::{RunObserver, RunSummary};
pub use state::{CodeExtraction, ConversationState, LogAgentOutput, LogItem, LogLevel};
pub use tool::{SchemaBuilder, Tool, ToolManager, ToolResult};
