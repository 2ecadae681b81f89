//! Text form of the Thought/Action/Observation protocol
//!
//! Models that answer in plain text instead of tool-use blocks write
//! `Action:` / `Action Input:` for a tool call and `Final Answer:` for the
//! terminal answer. Only JSON after `Final Answer:` is ever judged as output.

use serde_json::Value as JsonValue;

use crate::llm::{Message, MessageContent, extract_json_object};

const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const FINAL_ANSWER: &str = "Final Answer:";
const OBSERVATION: &str = "Observation:";

/// What a text-only reply asks for
#[derive(Debug, Clone, PartialEq)]
pub enum TextTurn {
    /// A tool call; `input` is `None` when no JSON object follows `Action Input:`
    Action {
        tool: String,
        input: Option<JsonValue>,
    },
    /// The terminal answer; `None` when no JSON object follows the marker
    FinalAnswer(Option<JsonValue>),
    /// Reasoning without an action
    Thought,
}

/// Classify a text-only reply
pub fn parse_text_turn(text: &str) -> TextTurn {
    if let Some(idx) = text.rfind(FINAL_ANSWER) {
        return TextTurn::FinalAnswer(extract_json_object(&text[idx + FINAL_ANSWER.len()..]));
    }

    let Some(action_idx) = text.rfind(ACTION) else {
        return TextTurn::Thought;
    };
    let rest = &text[action_idx + ACTION.len()..];

    let tool = rest
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '[' | ']'))
        .trim()
        .to_string();
    if tool.is_empty() {
        return TextTurn::Thought;
    }

    let input = rest.find(ACTION_INPUT).and_then(|idx| {
        let segment = &rest[idx + ACTION_INPUT.len()..];
        let segment = match segment.find(OBSERVATION) {
            Some(end) => &segment[..end],
            None => segment,
        };
        extract_json_object(segment)
    });

    TextTurn::Action { tool, input }
}

/// Observation message answering a text-form action
pub fn observation_message(results: &[MessageContent]) -> Message {
    let text = results
        .iter()
        .filter_map(|block| match block {
            MessageContent::ToolResult {
                content, is_error, ..
            } if *is_error => Some(format!("{} (error) {}", OBSERVATION, content)),
            MessageContent::ToolResult { content, .. } => {
                Some(format!("{} {}", OBSERVATION, content))
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");
    Message::user(text)
}
