//! Structured model output
//!
//! A [`StructuredOutput`] type is offered to the model as a forced tool whose
//! input schema is the output schema. [`complete_structured`] decodes and
//! validates the completion and grants a bounded number of corrective turns
//! before giving up with [`Error::Schema`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::client::LanguageModel;
use super::types::{
    Message, MessageContent, MessagesRequest, MessagesResponse, ToolChoice, ToolDefinition,
};

static FENCED_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok());

/// A typed value the model must emit in a fixed shape
pub trait StructuredOutput: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the forced tool carrying this output
    const NAME: &'static str;

    /// Description shown to the model
    const DESCRIPTION: &'static str;

    /// JSON schema of the output object
    fn schema() -> JsonValue;

    /// Semantic checks the schema cannot express
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Tool definition offering this output to the model
    fn tool_definition() -> ToolDefinition {
        ToolDefinition::new(Self::NAME, Self::DESCRIPTION, Self::schema())
    }

    /// Decode and validate a JSON value
    fn from_value(value: &JsonValue) -> Result<Self> {
        let parsed: Self = serde_json::from_value(value.clone()).map_err(|e| Error::Schema {
            schema: Self::NAME.to_string(),
            reason: e.to_string(),
        })?;
        parsed.validate().map_err(|reason| Error::Schema {
            schema: Self::NAME.to_string(),
            reason,
        })?;
        Ok(parsed)
    }
}

/// Find a JSON object in a free-text completion.
///
/// A fenced ```json block wins; otherwise the outermost `{...}` span is tried.
pub fn extract_json_object(text: &str) -> Option<JsonValue> {
    if let Some(re) = FENCED_JSON.as_ref() {
        if let Some(captures) = re.captures(text) {
            if let Ok(value) = serde_json::from_str::<JsonValue>(&captures[1]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<JsonValue>(&text[start..=end])
        .ok()
        .filter(JsonValue::is_object)
}

/// Where a candidate output came from in a model response
#[derive(Debug, Clone)]
pub enum Candidate {
    /// Input of a call to the output tool
    ToolCall { id: String, input: JsonValue },
    /// JSON object found in the text
    Text(JsonValue),
}

impl Candidate {
    pub fn value(&self) -> &JsonValue {
        match self {
            Candidate::ToolCall { input, .. } => input,
            Candidate::Text(value) => value,
        }
    }
}

/// Locate the candidate output of type `T` in a response, if any
pub fn find_candidate<T: StructuredOutput>(response: &MessagesResponse) -> Option<Candidate> {
    response
        .tool_uses()
        .into_iter()
        .find(|u| u.name == T::NAME)
        .map(|u| Candidate::ToolCall {
            id: u.id,
            input: u.input,
        })
        .or_else(|| extract_json_object(&response.text()).map(Candidate::Text))
}

/// Build the corrective message sent after an invalid candidate.
///
/// Every tool call in the rejected response is answered so the transcript
/// stays well formed.
pub fn correction_message(response: &MessagesResponse, schema: &str, reason: &str) -> Message {
    let text = format!(
        "Your output did not satisfy the {} schema: {}. Call the {} tool again with corrected arguments.",
        schema, reason, schema
    );

    let uses = response.tool_uses();
    if uses.is_empty() {
        return Message::user(text);
    }

    let results = uses
        .into_iter()
        .map(|u| {
            if u.name == schema {
                MessageContent::tool_result(u.id, text.clone(), true)
            } else {
                MessageContent::tool_result(
                    u.id,
                    format!("Not executed. Respond only with the {} tool.", schema),
                    true,
                )
            }
        })
        .collect();
    Message::tool_results(results)
}

/// Ask the model for a `T`, forcing the output tool.
///
/// Any tools already on the request are replaced by the output tool. After
/// `max_corrections` failed corrective turns the last violation is returned.
pub async fn complete_structured<T: StructuredOutput>(
    model: &dyn LanguageModel,
    mut request: MessagesRequest,
    max_corrections: usize,
) -> Result<T> {
    request.tools = Some(vec![T::tool_definition()]);
    request.tool_choice = Some(ToolChoice::tool(T::NAME));

    let mut attempt = 0;
    loop {
        let response = model.messages(request.clone()).await?;

        let reason = match find_candidate::<T>(&response) {
            Some(candidate) => match T::from_value(candidate.value()) {
                Ok(output) => {
                    debug!(schema = T::NAME, attempt, "Structured output accepted");
                    return Ok(output);
                }
                Err(Error::Schema { reason, .. }) => reason,
                Err(e) => return Err(e),
            },
            None => "no output object was produced".to_string(),
        };

        if attempt >= max_corrections {
            warn!(schema = T::NAME, %reason, "Structured output rejected");
            return Err(Error::Schema {
                schema: T::NAME.to_string(),
                reason,
            });
        }

        debug!(schema = T::NAME, attempt, %reason, "Requesting corrected output");
        request
            .messages
            .push(Message::assistant_blocks(response.content.clone()));
        request
            .messages
            .push(correction_message(&response, T::NAME, &reason));
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessagesRequestBuilder;
    use crate::testing::ScriptedModel;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Range {
        low: u32,
        high: u32,
    }

    impl StructuredOutput for Range {
        const NAME: &'static str = "Range";
        const DESCRIPTION: &'static str = "An inclusive range";

        fn schema() -> JsonValue {
            json!({
                "type": "object",
                "properties": {
                    "low": {"type": "integer"},
                    "high": {"type": "integer"}
                },
                "required": ["low", "high"]
            })
        }

        fn validate(&self) -> std::result::Result<(), String> {
            if self.low > self.high {
                return Err("low > high".to_string());
            }
            Ok(())
        }
    }

    fn request() -> MessagesRequest {
        MessagesRequestBuilder::new("test-model").user("give me a range").build()
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here you go:\n```json\n{\"low\": 1, \"high\": 2}\n```\nDone.";
        assert_eq!(extract_json_object(text), Some(json!({"low": 1, "high": 2})));
    }

    #[test]
    fn test_extract_bare_json() {
        let text = "Final Answer: {\"low\": 3, \"high\": 4}";
        assert_eq!(extract_json_object(text), Some(json!({"low": 3, "high": 4})));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[tokio::test]
    async fn test_forced_tool_accepted_first_try() {
        let model = ScriptedModel::new()
            .with_tool_call("Range", json!({"low": 1, "high": 5}));

        let range: Range = complete_structured(&model, request(), 1).await.unwrap();
        assert_eq!(range, Range { low: 1, high: 5 });

        let sent = model.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tool_choice, Some(ToolChoice::tool("Range")));
    }

    #[tokio::test]
    async fn test_one_correction_then_success() {
        let model = ScriptedModel::new()
            .with_tool_call("Range", json!({"low": 9, "high": 1}))
            .with_tool_call("Range", json!({"low": 1, "high": 9}));

        let range: Range = complete_structured(&model, request(), 1).await.unwrap();
        assert_eq!(range, Range { low: 1, high: 9 });

        let sent = model.requests();
        assert_eq!(sent.len(), 2);
        let correction = sent[1].messages.last().unwrap();
        match &correction.content[0] {
            MessageContent::ToolResult { content, is_error, .. } => {
                assert!(*is_error);
                assert!(content.contains("low > high"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_violation_is_fatal() {
        let model = ScriptedModel::new()
            .with_text("I cannot do that")
            .with_tool_call("Range", json!({"low": "x"}));

        let err = complete_structured::<Range>(&model, request(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Schema { ref schema, .. } if schema == "Range"));
        assert_eq!(model.requests().len(), 2);
    }
}
