//! Agent architecture
//!
//! ```text
//!                    ┌──────────────┐
//!   user query ────▶ │  Supervisor  │ ───▶ final answer
//!                    └──────┬───────┘
//!   transfer_to_logs_agent  │  transfer_to_codebase_agent
//!              ┌──────────────┴──────────────┐
//!              ▼                             ▼
//!   ┌─────────────────────┐      ┌─────────────────────┐
//!   │ SpecialistAgent     │      │ SpecialistAgent     │
//!   │   <LogAgentOutput>  │      │   <CodeExtraction>  │
//!   └─────────┬───────────┘      └─────────┬───────────┘
//!             ▼                            ▼
//!        state.logs               state.codebase_snippets
//! ```
//!
//! The supervisor owns the [`ConversationState`](crate::state::ConversationState)
//! for a run and lends it to one specialist at a time.

pub mod decision;
pub mod react;
pub mod specialist;
pub mod supervisor;
pub mod types;

pub use decision::{Decision, HANDOFF_PREFIX, handoff_tool_name, parse_decision};
pub use react::{TextTurn, parse_text_turn};
pub use specialist::{SpecialistAgent, SpecialistAgentBuilder};
pub use supervisor::{
    OutcomeStatus, RunResult, Supervisor, SupervisorBuilder, SupervisorOutcome,
};
pub use types::{AgentOutput, Specialist, SpecialistPhase, SpecialistReport, SpecialistStatus};
