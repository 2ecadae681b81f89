//! cluestack: incident investigation assistant
//!
//! Wires the logs and codebase specialists under a supervisor. The binary
//! in `main.rs` is a thin entry point over [`specialists`].

pub mod specialists;

pub use specialists::{
    CODEBASE_AGENT, DEMO_QUERY, LOGS_AGENT, build_supervisor, codebase_specialist,
    logs_specialist, supervisor,
};
