//! LLM API types
//!
//! The Anthropic Messages API shape is the internal lingua franca; the
//! OpenAI-compatible types below are converted to and from it.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![MessageContent::Text { text: text.into() }],
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: vec![MessageContent::Text { text: text.into() }],
        }
    }

    /// Create an assistant message from raw content blocks (text and tool uses)
    pub fn assistant_blocks(content: Vec<MessageContent>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }

    /// Create a user-role message carrying tool results
    pub fn tool_results(results: Vec<MessageContent>) -> Self {
        Self {
            role: "user".to_string(),
            content: results,
        }
    }

    /// Get text content from message
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| {
                if let MessageContent::Text { text } = c {
                    Some(text.clone())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool calls requested in this message, in order
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        tool_uses_of(&self.content)
    }
}

/// Content block in a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolUse {
        id: String,
        name: String,
        input: JsonValue,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }
}

/// A tool call extracted from a content block
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: JsonValue,
}

pub(crate) fn tool_uses_of(content: &[MessageContent]) -> Vec<ToolUse> {
    content
        .iter()
        .filter_map(|c| {
            if let MessageContent::ToolUse { id, name, input } = c {
                Some(ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Tool definition for the LLM API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: JsonValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// How the model may pick tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides
    Auto,
    /// Model must call some tool
    Any,
    /// Model must call the named tool
    Tool { name: String },
}

impl ToolChoice {
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }
}

/// Messages API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Messages API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub response_type: String,
    pub role: String,
    pub content: Vec<MessageContent>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
    pub stop_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl MessagesResponse {
    /// Concatenated text blocks of the response
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| {
                if let MessageContent::Text { text } = c {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool calls requested in this response, in order
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        tool_uses_of(&self.content)
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// ============================================================================
// OpenAI-compatible types
// ============================================================================

/// OpenAI-compatible chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn plain(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain("user", text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain("assistant", text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::plain("system", text)
    }

    /// Convert one internal message into OpenAI messages.
    ///
    /// Tool results become separate `tool` role messages; tool uses become
    /// `tool_calls` on the assistant message.
    pub fn from_message(msg: &Message) -> Vec<Self> {
        let mut out = Vec::new();
        let text = msg.text_content();

        if msg.role == "assistant" {
            let calls: Vec<ToolCallResponse> = msg
                .tool_uses()
                .into_iter()
                .map(|u| ToolCallResponse {
                    id: u.id,
                    call_type: "function".to_string(),
                    function: FunctionCallResponse {
                        name: u.name,
                        arguments: u.input.to_string(),
                    },
                })
                .collect();
            out.push(Self {
                role: msg.role.clone(),
                content: if text.is_empty() { None } else { Some(text) },
                tool_calls: if calls.is_empty() { None } else { Some(calls) },
                tool_call_id: None,
            });
            return out;
        }

        for block in &msg.content {
            if let MessageContent::ToolResult { tool_use_id, content, .. } = block {
                out.push(Self {
                    role: "tool".to_string(),
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id.clone()),
                });
            }
        }
        if !text.is_empty() {
            out.push(Self::plain(&msg.role, text));
        }
        out
    }
}

/// OpenAI-compatible tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAiFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiFunction {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

impl From<&ToolDefinition> for OpenAiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Convert from an Anthropic-style request
    pub fn from_claude_request(req: &MessagesRequest) -> Self {
        let mut messages = Vec::new();

        if let Some(system) = &req.system {
            messages.push(OpenAiMessage::system(system));
        }

        for msg in &req.messages {
            messages.extend(OpenAiMessage::from_message(msg));
        }

        let tools = req.tools.as_ref().map(|t| t.iter().map(OpenAiTool::from).collect());

        let tool_choice = req.tool_choice.as_ref().map(|choice| match choice {
            ToolChoice::Auto => JsonValue::String("auto".to_string()),
            ToolChoice::Any => JsonValue::String("required".to_string()),
            ToolChoice::Tool { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            }),
        });

        Self {
            model: req.model.clone(),
            messages,
            max_tokens: Some(req.max_tokens),
            tools,
            tool_choice,
            temperature: req.temperature,
        }
    }
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessageResponse,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCallResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ChatCompletionResponse {
    /// Convert to an Anthropic-style response
    pub fn to_claude_response(&self) -> MessagesResponse {
        let choice = self.choices.first();

        let content = match choice {
            Some(c) => {
                let mut content = Vec::new();

                if let Some(text) = &c.message.content {
                    if !text.is_empty() {
                        content.push(MessageContent::Text { text: text.clone() });
                    }
                }

                if let Some(tool_calls) = &c.message.tool_calls {
                    for tc in tool_calls {
                        // Undecodable arguments are kept verbatim so schema
                        // validation can report them back to the model.
                        let args: JsonValue = serde_json::from_str(&tc.function.arguments)
                            .unwrap_or_else(|_| JsonValue::String(tc.function.arguments.clone()));
                        content.push(MessageContent::ToolUse {
                            id: tc.id.clone(),
                            name: tc.function.name.clone(),
                            input: args,
                        });
                    }
                }

                content
            }
            None => vec![MessageContent::Text { text: String::new() }],
        };

        let stop_reason = choice
            .map(|c| match c.finish_reason.as_str() {
                "stop" => "end_turn".to_string(),
                "tool_calls" => "tool_use".to_string(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "end_turn".to_string());

        MessagesResponse {
            id: self.id.clone(),
            response_type: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model: self.model.clone(),
            stop_sequence: None,
            stop_reason,
            usage: self.usage.as_ref().map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        }
    }
}

/// Builder for creating messages requests
pub struct MessagesRequestBuilder {
    model: String,
    max_tokens: u64,
    system: Option<String>,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    tool_choice: Option<ToolChoice>,
    temperature: Option<f32>,
}

impl MessagesRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            system: None,
            messages: vec![],
            tools: vec![],
            tool_choice: None,
            temperature: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> MessagesRequest {
        MessagesRequest {
            model: self.model,
            max_tokens: self.max_tokens,
            system: self.system,
            messages: self.messages,
            tools: if self.tools.is_empty() {
                None
            } else {
                Some(self.tools)
            },
            tool_choice: self.tool_choice,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_choice_serialization() {
        let choice = ToolChoice::tool("LogQLQuery");
        let json = serde_json::to_value(&choice).unwrap();
        assert_eq!(json, json!({"type": "tool", "name": "LogQLQuery"}));
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), json!({"type": "auto"}));
    }

    #[test]
    fn test_builder_omits_empty_tools() {
        let request = MessagesRequestBuilder::new("m").user("hi").build();
        assert!(request.tools.is_none());
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("tools"));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn test_openai_conversion_of_tool_round_trip() {
        let assistant = Message::assistant_blocks(vec![
            MessageContent::text("Checking logs"),
            MessageContent::ToolUse {
                id: "call_1".into(),
                name: "get_logs".into(),
                input: json!({"logql_query": "{app=\"x\"}"}),
            },
        ]);
        let results = Message::tool_results(vec![MessageContent::tool_result("call_1", "[]", false)]);

        let converted = OpenAiMessage::from_message(&assistant);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].content.as_deref(), Some("Checking logs"));
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "get_logs");

        let converted = OpenAiMessage::from_message(&results);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "tool");
        assert_eq!(converted[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_openai_forced_tool_choice() {
        let request = MessagesRequestBuilder::new("gpt")
            .user("q")
            .tool_choice(ToolChoice::tool("CodeExtraction"))
            .build();
        let converted = ChatCompletionRequest::from_claude_request(&request);
        assert_eq!(
            converted.tool_choice,
            Some(json!({"type": "function", "function": {"name": "CodeExtraction"}}))
        );
    }

    #[test]
    fn test_openai_response_keeps_bad_arguments_verbatim() {
        let response = ChatCompletionResponse {
            id: "r".into(),
            object: "chat.completion".into(),
            created: 0,
            model: "gpt".into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessageResponse {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![ToolCallResponse {
                        id: "c".into(),
                        call_type: "function".into(),
                        function: FunctionCallResponse {
                            name: "get_logs".into(),
                            arguments: "{not json".into(),
                        },
                    }]),
                },
                finish_reason: "tool_calls".into(),
            }],
            usage: None,
        };

        let converted = response.to_claude_response();
        assert_eq!(converted.stop_reason, "tool_use");
        let uses = converted.tool_uses();
        assert_eq!(uses[0].input, JsonValue::String("{not json".into()));
    }

    #[test]
    fn test_tool_result_default_is_error() {
        let parsed: MessageContent =
            serde_json::from_str(r#"{"type":"tool_result","tool_use_id":"x","content":"ok"}"#).unwrap();
        assert_eq!(parsed, MessageContent::tool_result("x", "ok", false));
    }
}
