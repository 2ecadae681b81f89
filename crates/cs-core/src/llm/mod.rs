//! LLM API client and types

pub mod client;
pub mod structured;
pub mod types;

pub use client::{LanguageModel, LlmClient};
pub use structured::{StructuredOutput, complete_structured, extract_json_object};
pub use types::*;
