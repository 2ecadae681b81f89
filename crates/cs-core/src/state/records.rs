//! Evidence records produced by the specialists

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::llm::StructuredOutput;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured application log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogItem {
    /// Emission time, `YYYY-MM-DD HH:MM:SS UTC`
    pub asctime: String,
    /// Originating module
    pub name: String,
    pub levelname: LogLevel,
    pub filename: String,
    pub lineno: u32,
    #[serde(rename = "funcName")]
    pub func_name: String,
    pub message: String,
}

impl LogItem {
    /// Parse one JSON-encoded log line
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    fn schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "asctime": {"type": "string", "description": "Timestamp, YYYY-MM-DD HH:MM:SS UTC"},
                "name": {"type": "string", "description": "Originating module"},
                "levelname": {"type": "string", "enum": ["INFO", "WARNING", "ERROR"]},
                "filename": {"type": "string"},
                "lineno": {"type": "integer", "minimum": 0},
                "funcName": {"type": "string"},
                "message": {"type": "string"}
            },
            "required": ["asctime", "name", "levelname", "filename", "lineno", "funcName", "message"]
        })
    }
}

impl fmt::Display for LogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {}] - [{}] - {}",
            self.func_name, self.lineno, self.levelname, self.message
        )
    }
}

/// Terminal output of the logs specialist
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogAgentOutput {
    pub logs: Vec<LogItem>,
}

impl StructuredOutput for LogAgentOutput {
    const NAME: &'static str = "LogAgentOutput";
    const DESCRIPTION: &'static str =
        "Final answer: the log records relevant to the question, in the order they were fetched.";

    fn schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "logs": {"type": "array", "items": LogItem::schema()}
            },
            "required": ["logs"]
        })
    }
}

/// Terminal output of the codebase specialist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExtraction {
    pub source_code: String,
    pub start_line_number: u32,
    pub end_line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl CodeExtraction {
    /// Human-readable location, e.g. `src/feed.py:10-24 (publish)`
    pub fn location(&self) -> String {
        let mut location = match &self.file_path {
            Some(path) => format!("{}:{}-{}", path, self.start_line_number, self.end_line_number),
            None => format!("lines {}-{}", self.start_line_number, self.end_line_number),
        };
        if let Some(function) = &self.function_name {
            location.push_str(&format!(" ({})", function));
        }
        location
    }
}

impl StructuredOutput for CodeExtraction {
    const NAME: &'static str = "CodeExtraction";
    const DESCRIPTION: &'static str =
        "Final answer: the source code relevant to the question and where it lives.";

    fn schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "source_code": {"type": "string", "description": "Extracted source code"},
                "start_line_number": {"type": "integer", "minimum": 0},
                "end_line_number": {"type": "integer", "minimum": 0},
                "function_name": {"type": ["string", "null"]},
                "file_path": {"type": ["string", "null"]}
            },
            "required": ["source_code", "start_line_number", "end_line_number"]
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.start_line_number > self.end_line_number {
            return Err(format!(
                "start_line_number ({}) is greater than end_line_number ({})",
                self.start_line_number, self.end_line_number
            ));
        }
        Ok(())
    }
}
