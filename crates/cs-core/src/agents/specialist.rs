//! Specialist agent
//!
//! A reasoning loop bound to a fixed toolset and a required output type.
//! Each round-trip the model either calls a tool, whose result is fed back
//! as an observation, or calls the reserved final-answer tool named after the
//! output type. Text replies follow the protocol in [`super::react`]. The
//! loop is driven by an explicit phase machine:
//!
//! ```text
//! Reasoning -> ToolSelected -> ToolExecuting -> Observing -> Reasoning
//!                   |                |
//!                   v                v
//!          Terminated / Failed     Failed
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, debug, info, info_span, warn};

use super::react::{TextTurn, observation_message, parse_text_turn};
use super::types::{AgentOutput, Specialist, SpecialistPhase, SpecialistReport, SpecialistStatus};
use crate::error::{Error, Result};
use crate::llm::structured::{Candidate, correction_message, find_candidate};
use crate::llm::{LanguageModel, Message, MessageContent, MessagesResponse, ToolDefinition, ToolUse};
use crate::observability::RunObserver;
use crate::state::ConversationState;
use crate::tool::ToolManager;

/// Default reasoning round-trips before a run fails
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Transcript entries kept in a failure diagnostic
const DIAGNOSTIC_STEPS: usize = 6;

/// Characters of each entry kept in a failure diagnostic
const DIAGNOSTIC_TEXT: usize = 300;

/// How the model expressed its tool calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    ToolUse,
    Text,
}

/// Phase together with the data it carries
enum Step<O> {
    Reasoning,
    ToolSelected(MessagesResponse),
    ToolExecuting(Vec<ToolUse>, Protocol),
    Observing(Vec<MessageContent>, Protocol),
    Terminated(O),
    Failed(String),
}

impl<O> Step<O> {
    fn phase(&self) -> SpecialistPhase {
        match self {
            Step::Reasoning => SpecialistPhase::Reasoning,
            Step::ToolSelected(_) => SpecialistPhase::ToolSelected,
            Step::ToolExecuting(..) => SpecialistPhase::ToolExecuting,
            Step::Observing(..) => SpecialistPhase::Observing,
            Step::Terminated(_) => SpecialistPhase::Terminated,
            Step::Failed(_) => SpecialistPhase::Failed,
        }
    }
}

/// Final state of one loop execution
struct LoopOutcome<O> {
    output: std::result::Result<O, String>,
    iterations: usize,
    transcript: Vec<Message>,
}

/// Specialist agent producing an `O`
pub struct SpecialistAgent<O: AgentOutput> {
    name: String,
    description: String,
    system_prompt: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolManager,
    tool_definitions: Vec<ToolDefinition>,
    max_iterations: usize,
    schema_corrections: usize,
    _output: PhantomData<fn() -> O>,
}

impl<O: AgentOutput> SpecialistAgent<O> {
    /// Create a builder
    pub fn builder(
        name: impl Into<String>,
        model: Arc<dyn LanguageModel>,
    ) -> SpecialistAgentBuilder<O> {
        SpecialistAgentBuilder::new(name, model)
    }

    /// Rendered system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Definitions offered to the model, final-answer tool last
    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        &self.tool_definitions
    }

    fn opening_message(&self, task: &str, state: &ConversationState) -> Message {
        if state.handoffs().len() <= 1 && !state.has_evidence() {
            return Message::user(task);
        }
        Message::user(format!(
            "{}\n\nContext from the investigation so far:\n{}",
            task,
            state.evidence_summary()
        ))
    }

    /// Drive the phase machine until it terminates or fails
    async fn run_loop(&self, opening: Message, observer: &RunObserver) -> LoopOutcome<O> {
        let mut transcript = vec![opening];
        let mut iterations = 0;
        let mut corrections = 0;
        let mut step: Step<O> = Step::Reasoning;

        loop {
            debug!(agent = %self.name, phase = %step.phase(), iteration = iterations, "Specialist step");

            step = match step {
                Step::Reasoning => {
                    if iterations >= self.max_iterations {
                        Step::Failed(format!(
                            "no valid {} after {} reasoning steps",
                            O::NAME,
                            self.max_iterations
                        ))
                    } else {
                        iterations += 1;
                        observer.record_model_call(&self.name);
                        let request = self
                            .model
                            .request_builder()
                            .system(self.system_prompt.clone())
                            .messages(transcript.clone())
                            .tools(self.tool_definitions.clone())
                            .build();

                        match self.model.messages(request).await {
                            Ok(response) => Step::ToolSelected(response),
                            Err(e) => Step::Failed(format!("model call failed: {}", e)),
                        }
                    }
                }

                Step::ToolSelected(response) => {
                    if !response.content.is_empty() {
                        transcript.push(Message::assistant_blocks(response.content.clone()));
                    }
                    let uses = response.tool_uses();

                    if uses.is_empty() {
                        self.read_text_turn(&response, &mut corrections, &mut transcript)
                    } else if uses.iter().any(|u| u.name == O::NAME) {
                        match find_candidate::<O>(&response) {
                            Some(candidate) => self.judge_answer(
                                &candidate,
                                &response,
                                &mut corrections,
                                &mut transcript,
                            ),
                            None => Step::Failed(format!("{} call carried no input", O::NAME)),
                        }
                    } else {
                        Step::ToolExecuting(uses, Protocol::ToolUse)
                    }
                }

                Step::ToolExecuting(calls, protocol) => {
                    match self.execute_calls(calls, observer).await {
                        Ok(results) => Step::Observing(results, protocol),
                        Err(e) => Step::Failed(e.to_string()),
                    }
                }

                Step::Observing(results, protocol) => {
                    match protocol {
                        Protocol::ToolUse => transcript.push(Message::tool_results(results)),
                        Protocol::Text => transcript.push(observation_message(&results)),
                    }
                    Step::Reasoning
                }

                Step::Terminated(output) => {
                    return LoopOutcome {
                        output: Ok(output),
                        iterations,
                        transcript,
                    };
                }

                Step::Failed(reason) => {
                    return LoopOutcome {
                        output: Err(reason),
                        iterations,
                        transcript,
                    };
                }
            };
        }
    }

    /// Route a reply without tool-use blocks.
    ///
    /// Only a `Final Answer:` is judged against the output schema; a text
    /// `Action:` is dispatched like a tool call.
    fn read_text_turn(
        &self,
        response: &MessagesResponse,
        corrections: &mut usize,
        transcript: &mut Vec<Message>,
    ) -> Step<O> {
        match parse_text_turn(&response.text()) {
            TextTurn::FinalAnswer(Some(value)) => {
                self.judge_answer(&Candidate::Text(value), response, corrections, transcript)
            }
            TextTurn::Action {
                tool,
                input: Some(input),
            } if tool == O::NAME => {
                self.judge_answer(&Candidate::Text(input), response, corrections, transcript)
            }
            TextTurn::Action {
                tool,
                input: Some(input),
            } => {
                debug!(agent = %self.name, tool = %tool, "Text action selected");
                let call = ToolUse {
                    id: format!("text_action_{}", transcript.len()),
                    name: tool,
                    input,
                };
                Step::ToolExecuting(vec![call], Protocol::Text)
            }
            TextTurn::Action { tool, input: None } => {
                transcript.push(Message::user(format!(
                    "Observation: (error) the Action Input for '{}' must be a JSON object matching its input schema.",
                    tool
                )));
                Step::Reasoning
            }
            TextTurn::FinalAnswer(None) => {
                transcript.push(Message::user(format!(
                    "Your Final Answer carried no JSON object. Call {} with your final answer.",
                    O::NAME
                )));
                Step::Reasoning
            }
            TextTurn::Thought => {
                transcript.push(Message::user(format!(
                    "Continue. Call one of the available tools, or call {} with your final answer.",
                    O::NAME
                )));
                Step::Reasoning
            }
        }
    }

    /// Validate a terminal answer, granting a bounded number of corrections
    fn judge_answer(
        &self,
        candidate: &Candidate,
        response: &MessagesResponse,
        corrections: &mut usize,
        transcript: &mut Vec<Message>,
    ) -> Step<O> {
        match O::from_value(candidate.value()) {
            Ok(output) => Step::Terminated(output),
            Err(Error::Schema { reason, .. }) if *corrections < self.schema_corrections => {
                *corrections += 1;
                debug!(agent = %self.name, %reason, "Requesting corrected final answer");
                transcript.push(correction_message(response, O::NAME, &reason));
                Step::Reasoning
            }
            Err(e) => Step::Failed(e.to_string()),
        }
    }

    /// Execute the selected tools in order.
    ///
    /// Recoverable failures become error observations; a fatal failure
    /// aborts the run.
    async fn execute_calls(
        &self,
        calls: Vec<ToolUse>,
        observer: &RunObserver,
    ) -> Result<Vec<MessageContent>> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            debug!(agent = %self.name, tool = %call.name, input = %call.input, "Executing tool");

            let (output, is_error) = match self.tools.execute(&call.name, call.input).await {
                Ok(result) => (result.output, result.is_error),
                Err(e) if e.is_fatal_for_tool() => {
                    observer.record_tool_call(&self.name, &call.name, true);
                    return Err(Error::ToolExecution(format!("{}: {}", call.name, e)));
                }
                Err(e) => (e.to_string(), true),
            };

            observer.record_tool_call(&self.name, &call.name, is_error);
            results.push(MessageContent::tool_result(call.id, output, is_error));
        }

        Ok(results)
    }
}

/// Render the tail of a transcript for a failure diagnostic
pub fn render_transcript(transcript: &[Message]) -> String {
    let skip = transcript.len().saturating_sub(DIAGNOSTIC_STEPS);
    transcript
        .iter()
        .skip(skip)
        .map(|message| {
            let mut parts = Vec::new();
            let text = message.text_content();
            if !text.is_empty() {
                parts.push(truncate(&text, DIAGNOSTIC_TEXT));
            }
            for block in &message.content {
                match block {
                    MessageContent::ToolUse { name, input, .. } => {
                        parts.push(format!("-> {}({})", name, truncate(&input.to_string(), DIAGNOSTIC_TEXT)));
                    }
                    MessageContent::ToolResult { content, is_error, .. } => {
                        let tag = if *is_error { "<- error" } else { "<-" };
                        parts.push(format!("{} {}", tag, truncate(content, DIAGNOSTIC_TEXT)));
                    }
                    MessageContent::Text { .. } => {}
                }
            }
            format!("{}: {}", message.role, parts.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl<O: AgentOutput> Specialist for SpecialistAgent<O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn investigate(
        &self,
        task: &str,
        state: &mut ConversationState,
        observer: &RunObserver,
    ) -> SpecialistReport {
        let opening = self.opening_message(task, state);
        let span = info_span!("specialist", agent = %self.name);

        info!(agent = %self.name, task, "Specialist started");
        let outcome = self.run_loop(opening, observer).instrument(span).await;

        match outcome.output {
            Ok(output) => {
                let summary = output.summarize();
                output.record_into(state);
                info!(agent = %self.name, iterations = outcome.iterations, "Specialist terminated");
                SpecialistReport {
                    specialist: self.name.clone(),
                    status: SpecialistStatus::Terminated,
                    summary,
                    iterations: outcome.iterations,
                    diagnostic: None,
                }
            }
            Err(reason) => {
                warn!(agent = %self.name, iterations = outcome.iterations, %reason, "Specialist failed");
                observer.record_failure(&self.name, &reason);
                SpecialistReport {
                    specialist: self.name.clone(),
                    status: SpecialistStatus::Failed,
                    summary: reason,
                    iterations: outcome.iterations,
                    diagnostic: Some(render_transcript(&outcome.transcript)),
                }
            }
        }
    }
}

/// Builder for [`SpecialistAgent`]
pub struct SpecialistAgentBuilder<O: AgentOutput> {
    name: String,
    description: String,
    prompt_template: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolManager,
    max_iterations: usize,
    schema_corrections: usize,
    _output: PhantomData<fn() -> O>,
}

impl<O: AgentOutput> SpecialistAgentBuilder<O> {
    pub fn new(name: impl Into<String>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            prompt_template: String::new(),
            model,
            tools: ToolManager::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            schema_corrections: 1,
            _output: PhantomData,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System prompt template. `{tools}` and `{tool_names}` are replaced with
    /// the tool catalog and the comma-separated tool names.
    pub fn system_prompt(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn tools(mut self, tools: ToolManager) -> Self {
        self.tools = tools;
        self
    }

    /// Tools found at runtime. One named like the final answer is dropped
    /// instead of failing [`build`](Self::build).
    pub fn discovered_tools(mut self, mut tools: ToolManager) -> Self {
        if tools.remove(O::NAME).is_some() {
            warn!(
                agent = %self.name,
                tool = O::NAME,
                "Dropping discovered tool that shadows the final answer"
            );
        }
        self.tools = tools;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn schema_corrections(mut self, corrections: usize) -> Self {
        self.schema_corrections = corrections;
        self
    }

    /// Build the agent, fixing its toolset
    pub fn build(self) -> Result<SpecialistAgent<O>> {
        if self.tools.contains(O::NAME) {
            return Err(Error::Config(format!(
                "tool name '{}' is reserved for the final answer of '{}'",
                O::NAME,
                self.name
            )));
        }

        let mut tool_definitions = self.tools.definitions();
        tool_definitions.push(O::tool_definition());

        let catalog = tool_definitions
            .iter()
            .map(|d| format!("{}: {}", d.name, d.description))
            .collect::<Vec<_>>()
            .join("\n");
        let names = tool_definitions
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let system_prompt = self
            .prompt_template
            .replace("{tools}", &catalog)
            .replace("{tool_names}", &names);

        Ok(SpecialistAgent {
            name: self.name,
            description: self.description,
            system_prompt,
            model: self.model,
            tools: self.tools,
            tool_definitions,
            max_iterations: self.max_iterations,
            schema_corrections: self.schema_corrections,
            _output: PhantomData,
        })
    }
}
