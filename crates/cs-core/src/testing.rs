//! Test doubles shared by the workspace test suites
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for downstream crates.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::llm::{LanguageModel, MessageContent, MessagesRequest, MessagesResponse, Usage};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A [`LanguageModel`] that replays queued responses and records every request
pub struct ScriptedModel {
    model: String,
    responses: Mutex<VecDeque<Result<MessagesResponse>>>,
    requests: Mutex<Vec<MessagesRequest>>,
    next_id: AtomicUsize,
}

impl ScriptedModel {
    /// Create an empty script
    pub fn new() -> Self {
        Self {
            model: "scripted-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    fn push(self, response: Result<MessagesResponse>) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    fn tool_id(&self) -> String {
        format!("toolu_{:03}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue a raw response
    pub fn with_response(self, response: MessagesResponse) -> Self {
        self.push(Ok(response))
    }

    /// Queue a plain text reply
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let response = scripted_response(vec![MessageContent::text(text)], "end_turn");
        self.push(Ok(response))
    }

    /// Queue a reply without any content block
    pub fn with_empty(self) -> Self {
        let response = scripted_response(Vec::new(), "end_turn");
        self.push(Ok(response))
    }

    /// Queue a reply that calls a single tool
    pub fn with_tool_call(self, name: &str, input: JsonValue) -> Self {
        self.with_tool_calls(vec![(name, input)])
    }

    /// Queue a reply that calls several tools in one turn
    pub fn with_tool_calls(self, calls: Vec<(&str, JsonValue)>) -> Self {
        let content = calls
            .into_iter()
            .map(|(name, input)| MessageContent::ToolUse {
                id: self.tool_id(),
                name: name.to_string(),
                input,
            })
            .collect();
        let response = scripted_response(content, "tool_use");
        self.push(Ok(response))
    }

    /// Queue a failed inference call
    pub fn with_error(self, error: Error) -> Self {
        self.push(Err(error))
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<MessagesRequest> {
        lock(&self.requests).clone()
    }

    /// Number of queued responses not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        lock(&self.requests).push(request);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(Error::LlmApi("scripted model has no responses left".to_string())))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn scripted_response(content: Vec<MessageContent>, stop_reason: &str) -> MessagesResponse {
    MessagesResponse {
        id: "msg_scripted".to_string(),
        response_type: "message".to_string(),
        role: "assistant".to_string(),
        content,
        model: "scripted-model".to_string(),
        stop_sequence: None,
        stop_reason: stop_reason.to_string(),
        usage: Some(Usage::default()),
    }
}
