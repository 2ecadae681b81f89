//! Agent types and trait definitions
//!
//! - [`AgentOutput`]: terminal output of a specialist
//! - [`Specialist`]: interface the supervisor delegates through
//! - [`SpecialistReport`]: what a specialist hands back

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::llm::StructuredOutput;
use crate::observability::RunObserver;
use crate::state::{CodeExtraction, ConversationState, HandoffStatus, LogAgentOutput};

/// Log lines included in a logs summary
const SUMMARY_LOG_LINES: usize = 50;

/// Structured terminal output of a specialist
pub trait AgentOutput: StructuredOutput + Clone {
    /// Text handed back to the supervisor
    fn summarize(&self) -> String;

    /// Append this output to its side-channel of the shared state
    fn record_into(self, state: &mut ConversationState);
}

impl AgentOutput for LogAgentOutput {
    fn summarize(&self) -> String {
        if self.logs.is_empty() {
            return "No log records matched.".to_string();
        }

        let mut out = format!("Fetched {} log records:\n", self.logs.len());
        for item in self.logs.iter().take(SUMMARY_LOG_LINES) {
            out.push_str(&format!("{} {}\n", item.asctime, item));
        }
        if self.logs.len() > SUMMARY_LOG_LINES {
            out.push_str(&format!("... {} more", self.logs.len() - SUMMARY_LOG_LINES));
        }
        out.trim_end().to_string()
    }

    fn record_into(self, state: &mut ConversationState) {
        state.append_logs(self.logs);
    }
}

impl AgentOutput for CodeExtraction {
    fn summarize(&self) -> String {
        format!("Extracted code at {}:\n```\n{}\n```", self.location(), self.source_code)
    }

    fn record_into(self, state: &mut ConversationState) {
        state.append_snippet(self);
    }
}

/// Phase of the specialist reasoning loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialistPhase {
    Reasoning,
    ToolSelected,
    ToolExecuting,
    Observing,
    Terminated,
    Failed,
}

impl fmt::Display for SpecialistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Reasoning => "reasoning",
            Self::ToolSelected => "tool_selected",
            Self::ToolExecuting => "tool_executing",
            Self::Observing => "observing",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How a specialist run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistStatus {
    Terminated,
    Failed,
}

impl From<SpecialistStatus> for HandoffStatus {
    fn from(status: SpecialistStatus) -> Self {
        match status {
            SpecialistStatus::Terminated => HandoffStatus::Completed,
            SpecialistStatus::Failed => HandoffStatus::Failed,
        }
    }
}

/// Result of one specialist run
#[derive(Debug, Clone, Serialize)]
pub struct SpecialistReport {
    pub specialist: String,
    pub status: SpecialistStatus,
    /// Output summary on success, failure reason otherwise
    pub summary: String,
    /// Reasoning round-trips used
    pub iterations: usize,
    /// Partial transcript of a failed run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl SpecialistReport {
    pub fn is_failed(&self) -> bool {
        self.status == SpecialistStatus::Failed
    }

    /// Text returned to the supervisor as the handoff's tool result
    pub fn to_observation(&self) -> String {
        match self.status {
            SpecialistStatus::Terminated => self.summary.clone(),
            SpecialistStatus::Failed => match &self.diagnostic {
                Some(diagnostic) => format!(
                    "The {} specialist failed: {}\n\nPartial transcript:\n{}",
                    self.specialist, self.summary, diagnostic
                ),
                None => format!("The {} specialist failed: {}", self.specialist, self.summary),
            },
        }
    }
}

/// An agent the supervisor can hand a sub-query to
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Short identifier, used in the handoff tool name
    fn name(&self) -> &str;

    /// What the specialist can do, shown to the supervisor
    fn description(&self) -> &str;

    /// Investigate `task`, recording any evidence into `state`.
    ///
    /// Never fails: a failed run is reported through the returned report.
    async fn investigate(
        &self,
        task: &str,
        state: &mut ConversationState,
        observer: &RunObserver,
    ) -> SpecialistReport;
}
