//! Supervisor agent
//!
//! Delegates a user query to specialists through `transfer_to_<name>` tools
//! and synthesizes their findings. A run always ends with an answer: when the
//! budget runs out or the model fails, the answer is a summary of whatever
//! evidence was collected, flagged unresolved.

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, debug, info, warn};

use super::decision::{Decision, handoff_tool, parse_decision};
use super::types::Specialist;
use crate::error::{Error, Result};
use crate::llm::{LanguageModel, Message, MessageContent, MessagesResponse, ToolDefinition};
use crate::observability::{RunObserver, RunSummary};
use crate::state::{ConversationState, HandoffStatus};

const AGENT: &str = "supervisor";

/// Whether the supervisor reached its own answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Resolved,
    Unresolved,
}

/// Final answer of a run
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorOutcome {
    pub status: OutcomeStatus,
    pub answer: String,
    /// Supervisor reasoning turns used
    pub turns: usize,
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunResult {
    pub outcome: SupervisorOutcome,
    pub state: ConversationState,
    pub summary: RunSummary,
}

/// Top-level agent whose tools are the specialists
pub struct Supervisor {
    model: Arc<dyn LanguageModel>,
    specialists: Vec<Arc<dyn Specialist>>,
    handoff_tools: Vec<ToolDefinition>,
    system_prompt: String,
    max_turns: usize,
    max_clarifications: usize,
}

impl Supervisor {
    /// Create a builder
    pub fn builder(model: Arc<dyn LanguageModel>) -> SupervisorBuilder {
        SupervisorBuilder::new(model)
    }

    pub fn handoff_tools(&self) -> &[ToolDefinition] {
        &self.handoff_tools
    }

    fn specialist(&self, name: &str) -> Option<&Arc<dyn Specialist>> {
        self.specialists.iter().find(|s| s.name() == name)
    }

    /// Answer a user query in a fresh run
    pub async fn run(&self, query: &str) -> RunResult {
        let observer = RunObserver::open();
        let mut state = ConversationState::with_query(query);

        info!(run_id = %observer.run_id(), query, "Run started");
        let span = observer.span().clone();
        let outcome = self.drive(&mut state, &observer).instrument(span).await;

        let summary = observer.flush(outcome.status == OutcomeStatus::Resolved);
        RunResult {
            outcome,
            state,
            summary,
        }
    }

    /// Run the decision loop over an existing state.
    ///
    /// The last message of `state` should be the user query.
    pub async fn drive(
        &self,
        state: &mut ConversationState,
        observer: &RunObserver,
    ) -> SupervisorOutcome {
        let names: Vec<&str> = self.specialists.iter().map(|s| s.name()).collect();
        let mut clarifications = 0;

        for turn in 1..=self.max_turns {
            observer.record_model_call(AGENT);
            let request = self
                .model
                .request_builder()
                .system(self.system_prompt.clone())
                .messages(state.messages().iter().cloned())
                .tools(self.handoff_tools.clone())
                .build();

            let response = match self.model.messages(request).await {
                Ok(response) => response,
                Err(e) => {
                    let reason = format!("model call failed: {}", e);
                    observer.record_failure(AGENT, &reason);
                    return unresolved(state, &reason, turn);
                }
            };

            match parse_decision(&response, &names) {
                Decision::Terminate { answer } => {
                    info!(turn, "Supervisor answered");
                    state.push_message(Message::assistant(answer.clone()));
                    return SupervisorOutcome {
                        status: OutcomeStatus::Resolved,
                        answer,
                        turns: turn,
                    };
                }

                Decision::Handoff {
                    call_id,
                    specialist,
                    sub_query,
                } => {
                    if let Err(e) = self
                        .hand_off(&response, call_id, &specialist, &sub_query, state, observer)
                        .await
                    {
                        observer.record_failure(AGENT, &e.to_string());
                        return unresolved(state, &e.to_string(), turn);
                    }
                }

                Decision::Unparseable { reason } => {
                    clarifications += 1;
                    warn!(turn, clarifications, %reason, "Unparseable supervisor output");
                    if clarifications > self.max_clarifications {
                        let reason = format!("supervisor output could not be interpreted: {}", reason);
                        observer.record_failure(AGENT, &reason);
                        return unresolved(state, &reason, turn);
                    }
                    if !response.content.is_empty() {
                        state.push_message(Message::assistant_blocks(response.content.clone()));
                    }
                    state.push_message(clarification(&response, &reason));
                }
            }
        }

        let reason = format!("no final answer after {} supervisor turns", self.max_turns);
        observer.record_failure(AGENT, &reason);
        unresolved(state, &reason, self.max_turns)
    }

    /// Execute one handoff and record its side effects
    async fn hand_off(
        &self,
        response: &MessagesResponse,
        call_id: String,
        specialist: &str,
        sub_query: &str,
        state: &mut ConversationState,
        observer: &RunObserver,
    ) -> Result<()> {
        let agent = self
            .specialist(specialist)
            .cloned()
            .ok_or_else(|| Error::UnknownTool(specialist.to_string()))?;

        state.push_message(Message::assistant_blocks(response.content.clone()));
        let id = state.record_handoff(specialist, sub_query);
        observer.record_handoff(specialist);

        let report = agent.investigate(sub_query, state, observer).await;
        state.settle_handoff(id, HandoffStatus::from(report.status));
        debug!(specialist, status = ?report.status, iterations = report.iterations, "Handoff returned");

        let mut results = vec![MessageContent::tool_result(
            call_id.clone(),
            report.to_observation(),
            report.is_failed(),
        )];
        for extra in response.tool_uses().into_iter().filter(|u| u.id != call_id) {
            results.push(MessageContent::tool_result(
                extra.id,
                "Not executed: only one transfer runs per turn. Re-issue this call in a new turn if it is still needed.",
                true,
            ));
        }
        state.push_message(Message::tool_results(results));

        Ok(())
    }
}

/// Corrective message after an unparseable turn
fn clarification(response: &MessagesResponse, reason: &str) -> Message {
    let text = format!(
        "Your last reply could not be interpreted: {}. Either call exactly one transfer tool with a 'query', or reply with the final answer as plain text.",
        reason
    );

    let uses = response.tool_uses();
    if uses.is_empty() {
        return Message::user(text);
    }
    Message::tool_results(
        uses.into_iter()
            .map(|u| MessageContent::tool_result(u.id, text.clone(), true))
            .collect(),
    )
}

/// Fallback answer built from the evidence gathered so far
fn unresolved(state: &mut ConversationState, reason: &str, turns: usize) -> SupervisorOutcome {
    warn!(%reason, "Run ended unresolved");
    let answer = format!(
        "The investigation could not be completed ({}).\n\n{}",
        reason,
        state.evidence_summary()
    );
    state.push_message(Message::assistant(answer.clone()));
    SupervisorOutcome {
        status: OutcomeStatus::Unresolved,
        answer,
        turns,
    }
}

/// Builder for [`Supervisor`]
pub struct SupervisorBuilder {
    model: Arc<dyn LanguageModel>,
    specialists: Vec<Arc<dyn Specialist>>,
    system_prompt: String,
    max_turns: usize,
    max_clarifications: usize,
}

impl SupervisorBuilder {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            specialists: Vec::new(),
            system_prompt: String::new(),
            max_turns: 8,
            max_clarifications: 2,
        }
    }

    pub fn specialist(mut self, specialist: Arc<dyn Specialist>) -> Self {
        self.specialists.push(specialist);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn max_clarifications(mut self, max_clarifications: usize) -> Self {
        self.max_clarifications = max_clarifications;
        self
    }

    pub fn build(self) -> Result<Supervisor> {
        if self.specialists.is_empty() {
            return Err(Error::Config("supervisor needs at least one specialist".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for specialist in &self.specialists {
            if !seen.insert(specialist.name().to_string()) {
                return Err(Error::Config(format!(
                    "duplicate specialist name '{}'",
                    specialist.name()
                )));
            }
        }

        let handoff_tools = self
            .specialists
            .iter()
            .map(|s| handoff_tool(s.name(), s.description()))
            .collect();

        Ok(Supervisor {
            model: self.model,
            specialists: self.specialists,
            handoff_tools,
            system_prompt: self.system_prompt,
            max_turns: self.max_turns,
            max_clarifications: self.max_clarifications,
        })
    }
}
