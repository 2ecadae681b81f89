//! Shared conversation state
//!
//! One [`ConversationState`] is owned by each orchestration run and lent by
//! `&mut` to whichever agent is active. Every collection is append-only.

pub mod records;

use serde::Serialize;

use crate::llm::Message;

pub use records::{CodeExtraction, LogAgentOutput, LogItem, LogLevel};

/// Log lines shown in an evidence summary before eliding the rest
const SUMMARY_LOG_LINES: usize = 20;

/// Outcome of a handoff to a specialist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    /// Specialist is still running
    Pending,
    Completed,
    Failed,
}

/// One delegation from the supervisor to a specialist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffRecord {
    pub specialist: String,
    pub sub_query: String,
    pub status: HandoffStatus,
}

/// Index of a handoff in [`ConversationState::handoffs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffId(usize);

/// Messages plus the evidence side-channels of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    logs: Vec<LogItem>,
    codebase_snippets: Vec<CodeExtraction>,
    handoffs: Vec<HandoffRecord>,
}

impl ConversationState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state whose first message is the user query
    pub fn with_query(query: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.push_message(Message::user(query));
        state
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn append_logs(&mut self, logs: impl IntoIterator<Item = LogItem>) {
        self.logs.extend(logs);
    }

    pub fn append_snippet(&mut self, snippet: CodeExtraction) {
        self.codebase_snippets.push(snippet);
    }

    /// Append a pending handoff
    pub fn record_handoff(
        &mut self,
        specialist: impl Into<String>,
        sub_query: impl Into<String>,
    ) -> HandoffId {
        self.handoffs.push(HandoffRecord {
            specialist: specialist.into(),
            sub_query: sub_query.into(),
            status: HandoffStatus::Pending,
        });
        HandoffId(self.handoffs.len() - 1)
    }

    /// Settle a pending handoff. Settled records are never changed again.
    pub fn settle_handoff(&mut self, id: HandoffId, status: HandoffStatus) {
        if let Some(record) = self.handoffs.get_mut(id.0) {
            if record.status == HandoffStatus::Pending {
                record.status = status;
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn logs(&self) -> &[LogItem] {
        &self.logs
    }

    pub fn codebase_snippets(&self) -> &[CodeExtraction] {
        &self.codebase_snippets
    }

    pub fn handoffs(&self) -> &[HandoffRecord] {
        &self.handoffs
    }

    /// Whether any specialist has contributed evidence
    pub fn has_evidence(&self) -> bool {
        !self.logs.is_empty() || !self.codebase_snippets.is_empty()
    }

    /// Plain-text digest of the evidence gathered so far
    pub fn evidence_summary(&self) -> String {
        if self.handoffs.is_empty() && !self.has_evidence() {
            return "No evidence collected yet.".to_string();
        }

        let mut out = String::new();

        if !self.handoffs.is_empty() {
            out.push_str("Specialists consulted:\n");
            for record in &self.handoffs {
                out.push_str(&format!(
                    "- {} ({:?}): {}\n",
                    record.specialist, record.status, record.sub_query
                ));
            }
        }

        if !self.logs.is_empty() {
            out.push_str(&format!("Log records ({}):\n", self.logs.len()));
            for item in self.logs.iter().take(SUMMARY_LOG_LINES) {
                out.push_str(&format!("{} {}\n", item.asctime, item));
            }
            if self.logs.len() > SUMMARY_LOG_LINES {
                out.push_str(&format!(
                    "... {} more\n",
                    self.logs.len() - SUMMARY_LOG_LINES
                ));
            }
        }

        for snippet in &self.codebase_snippets {
            out.push_str(&format!(
                "Code at {}:\n{}\n",
                snippet.location(),
                snippet.source_code
            ));
        }

        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(message: &str) -> LogItem {
        LogItem {
            asctime: "2025-06-14 15:35:47 UTC".into(),
            name: "publisher".into(),
            levelname: LogLevel::Warning,
            filename: "feed.py".into(),
            lineno: 12,
            func_name: "tick".into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_side_channels_append_in_order() {
        let mut state = ConversationState::with_query("why stale?");
        state.append_logs(vec![item("a"), item("b")]);
        state.append_logs(vec![item("c")]);

        let messages: Vec<_> = state.logs().iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_handoff_settles_once() {
        let mut state = ConversationState::new();
        let id = state.record_handoff("logs", "find errors");
        assert_eq!(state.handoffs()[0].status, HandoffStatus::Pending);

        state.settle_handoff(id, HandoffStatus::Failed);
        state.settle_handoff(id, HandoffStatus::Completed);
        assert_eq!(state.handoffs()[0].status, HandoffStatus::Failed);
    }

    #[test]
    fn test_evidence_summary() {
        let mut state = ConversationState::new();
        assert_eq!(state.evidence_summary(), "No evidence collected yet.");

        state.record_handoff("codebase", "find publisher");
        state.append_logs(vec![item("feed lagging")]);
        state.append_snippet(CodeExtraction {
            source_code: "def tick(): ...".into(),
            start_line_number: 5,
            end_line_number: 9,
            function_name: Some("tick".into()),
            file_path: None,
        });

        let summary = state.evidence_summary();
        assert!(summary.contains("- codebase (Pending): find publisher"));
        assert!(summary.contains("[tick - 12] - [WARNING] - feed lagging"));
        assert!(summary.contains("Code at lines 5-9 (tick)"));
    }
}
