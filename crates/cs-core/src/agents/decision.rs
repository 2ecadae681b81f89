//! Supervisor decisions
//!
//! Every supervisor reasoning step is parsed into exactly one [`Decision`].
//! Output that fits none of the known shapes is never guessed at.

use serde_json::{Value as JsonValue, json};

use crate::llm::{MessagesResponse, ToolDefinition};

/// Prefix of every handoff tool name
pub const HANDOFF_PREFIX: &str = "transfer_to_";

/// Handoff tool name for a specialist
pub fn handoff_tool_name(specialist: &str) -> String {
    format!("{}{}", HANDOFF_PREFIX, specialist)
}

/// Handoff tool offered to the supervisor model
pub fn handoff_tool(specialist: &str, description: &str) -> ToolDefinition {
    ToolDefinition::new(
        handoff_tool_name(specialist),
        format!("Ask the {} specialist. {}", specialist, description),
        handoff_schema(),
    )
}

fn handoff_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Self-contained question for the specialist"
            }
        },
        "required": ["query"]
    })
}

/// What the supervisor chose to do in one turn
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Delegate to a specialist
    Handoff {
        call_id: String,
        specialist: String,
        sub_query: String,
    },
    /// Finish with a synthesized answer
    Terminate { answer: String },
    /// Output fits no known shape
    Unparseable { reason: String },
}

/// Parse one supervisor response.
///
/// Only the first tool call is considered; the caller answers any others.
pub fn parse_decision(response: &MessagesResponse, specialists: &[&str]) -> Decision {
    let uses = response.tool_uses();

    let Some(call) = uses.first() else {
        let answer = response.text().trim().to_string();
        if answer.is_empty() {
            return Decision::Unparseable {
                reason: "the reply was empty".to_string(),
            };
        }
        return Decision::Terminate { answer };
    };

    let Some(specialist) = call
        .name
        .strip_prefix(HANDOFF_PREFIX)
        .filter(|name| specialists.contains(name))
    else {
        return Decision::Unparseable {
            reason: format!(
                "'{}' is not a handoff tool; available: {}",
                call.name,
                specialists
                    .iter()
                    .map(|s| handoff_tool_name(s))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
    };

    match call.input.get("query").and_then(JsonValue::as_str).map(str::trim) {
        Some(query) if !query.is_empty() => Decision::Handoff {
            call_id: call.id.clone(),
            specialist: specialist.to_string(),
            sub_query: query.to_string(),
        },
        _ => Decision::Unparseable {
            reason: format!("{} requires a non-empty 'query' string", call.name),
        },
    }
}
