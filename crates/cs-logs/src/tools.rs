//! Log tools exposed to the logs specialist
//!
//! - `get_logql_from_nl_query`: question -> [`LogQLQuery`] via one model call
//! - `get_logs`: LogQL query -> log records via the Loki backend

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cs_core::llm::{LanguageModel, StructuredOutput, complete_structured};
use cs_core::state::LogAgentOutput;
use cs_core::tool::{SchemaBuilder, Tool, ToolResult};
use cs_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::info;

use crate::client::LokiClient;
use crate::prompts::render_system_prompt;
use crate::window::parse_time;

pub const LOGQL_TOOL_NAME: &str = "get_logql_from_nl_query";
pub const FETCH_TOOL_NAME: &str = "get_logs";

/// Sampling temperature of LogQL generation
const LOGQL_TEMPERATURE: f32 = 0.1;

/// Timeout of one LogQL generation call
const LOGQL_TIMEOUT_SECS: u64 = 60;

/// A LogQL query with an optional UTC time range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQLQuery {
    pub logql_query: String,
    /// `YYYY-MM-DD HH:MM:SS`, or empty for the default lookback
    #[serde(default)]
    pub from_time: String,
    #[serde(default)]
    pub to_time: String,
}

impl StructuredOutput for LogQLQuery {
    const NAME: &'static str = "LogQLQuery";
    const DESCRIPTION: &'static str = "A LogQL query answering the question, with an optional time range.";

    fn schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "logql_query": {
                    "type": "string",
                    "description": "LogQL query including the stream selector"
                },
                "from_time": {
                    "type": "string",
                    "description": "Range start, YYYY-MM-DD HH:MM:SS UTC, or empty"
                },
                "to_time": {
                    "type": "string",
                    "description": "Range end, YYYY-MM-DD HH:MM:SS UTC, or empty"
                }
            },
            "required": ["logql_query"]
        })
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.logql_query.trim().is_empty() {
            return Err("logql_query is empty".to_string());
        }
        for (field, value) in [("from_time", &self.from_time), ("to_time", &self.to_time)] {
            if !value.trim().is_empty() && parse_time(value).is_none() {
                return Err(format!("{} '{}' is not YYYY-MM-DD HH:MM:SS", field, value));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LogQlArgs {
    query: String,
    user_application: String,
}

/// Turns a natural-language question into a [`LogQLQuery`]
pub struct LogQlGeneratorTool {
    model: Arc<dyn LanguageModel>,
    schema_corrections: usize,
    clock: fn() -> DateTime<Utc>,
}

impl LogQlGeneratorTool {
    /// Create a new generator
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            schema_corrections: 1,
            clock: Utc::now,
        }
    }

    pub fn with_schema_corrections(mut self, corrections: usize) -> Self {
        self.schema_corrections = corrections;
        self
    }

    /// Replace the clock used for the prompt's current time
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Generate a query for `question` about `user_application`
    pub async fn generate(&self, question: &str, user_application: &str) -> Result<LogQLQuery> {
        let system = render_system_prompt(user_application, (self.clock)());
        let request = self
            .model
            .request_builder()
            .system(system)
            .user(question)
            .temperature(LOGQL_TEMPERATURE)
            .build();

        let query = tokio::time::timeout(
            Duration::from_secs(LOGQL_TIMEOUT_SECS),
            complete_structured::<LogQLQuery>(self.model.as_ref(), request, self.schema_corrections),
        )
        .await
        .map_err(|_| Error::Timeout(LOGQL_TIMEOUT_SECS))??;

        info!(
            logql = %query.logql_query,
            from = %query.from_time,
            to = %query.to_time,
            "Generated LogQL query"
        );
        Ok(query)
    }
}

#[async_trait]
impl Tool for LogQlGeneratorTool {
    fn name(&self) -> &str {
        LOGQL_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Convert a natural-language log question into a LogQL query for the given application, \
         with an optional time range (from_time/to_time, YYYY-MM-DD HH:MM:SS UTC)."
    }

    fn input_schema(&self) -> JsonValue {
        SchemaBuilder::object_schema(vec![
            ("query", "string", "Natural-language description of the logs wanted", true),
            ("user_application", "string", "Application whose logs are searched", true),
        ])
    }

    fn output_schema(&self) -> Option<JsonValue> {
        Some(LogQLQuery::schema())
    }

    async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
        let args: LogQlArgs =
            serde_json::from_value(input).map_err(|e| Error::InvalidArguments(e.to_string()))?;
        let query = self.generate(&args.query, &args.user_application).await?;
        ToolResult::json(&query)
    }
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    logql_query: String,
    #[serde(default)]
    from_time: Option<String>,
    #[serde(default)]
    to_time: Option<String>,
}

/// Runs a LogQL query against the log backend
pub struct LogFetchTool {
    client: Arc<LokiClient>,
}

impl LogFetchTool {
    /// Create a new fetch tool
    pub fn new(client: Arc<LokiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for LogFetchTool {
    fn name(&self) -> &str {
        FETCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch log records with a LogQL query. from_time and to_time (YYYY-MM-DD HH:MM:SS UTC) \
         are optional; without a valid pair the most recent records are returned."
    }

    fn input_schema(&self) -> JsonValue {
        SchemaBuilder::object_schema(vec![
            ("logql_query", "string", "LogQL query to execute", true),
            ("from_time", "string", "Range start, YYYY-MM-DD HH:MM:SS UTC", false),
            ("to_time", "string", "Range end, YYYY-MM-DD HH:MM:SS UTC", false),
        ])
    }

    fn output_schema(&self) -> Option<JsonValue> {
        Some(LogAgentOutput::schema())
    }

    async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
        let args: FetchArgs =
            serde_json::from_value(input).map_err(|e| Error::InvalidArguments(e.to_string()))?;
        if args.logql_query.trim().is_empty() {
            return Err(Error::InvalidArguments("logql_query is empty".to_string()));
        }

        let window = self
            .client
            .window(args.from_time.as_deref(), args.to_time.as_deref());
        let logs = self.client.fetch(&args.logql_query, &window).await?;

        ToolResult::json(&LogAgentOutput { logs })
    }
}
