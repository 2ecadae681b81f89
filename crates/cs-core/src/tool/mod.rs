//! Tool system
//!
//! Tools are the remote capabilities agents invoke through model tool calls.

pub mod definition;
pub mod manager;
pub mod traits;

pub use definition::{SchemaBuilder, ToolDeclaration, ToolDefinition};
pub use manager::ToolManager;
pub use traits::{Tool, ToolResult};
