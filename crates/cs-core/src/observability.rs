//! Per-run observability
//!
//! A [`RunObserver`] is opened when an orchestration run starts and flushed
//! into a [`RunSummary`] when it ends. It owns the run's tracing span and the
//! counters agents bump as they work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{Span, info, info_span, warn};
use uuid::Uuid;

/// Counters and span for one orchestration run
#[derive(Debug)]
pub struct RunObserver {
    run_id: Uuid,
    span: Span,
    started: Instant,
    model_calls: AtomicUsize,
    tool_calls: AtomicUsize,
    tool_errors: AtomicUsize,
    handoffs: AtomicUsize,
    failures: AtomicUsize,
}

impl RunObserver {
    /// Open a new run
    pub fn open() -> Self {
        let run_id = Uuid::now_v7();
        let span = info_span!("run", run_id = %run_id);
        Self {
            run_id,
            span,
            started: Instant::now(),
            model_calls: AtomicUsize::new(0),
            tool_calls: AtomicUsize::new(0),
            tool_errors: AtomicUsize::new(0),
            handoffs: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Span every event of the run is recorded under
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn record_model_call(&self, agent: &str) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(agent, "model call");
    }

    pub fn record_tool_call(&self, agent: &str, tool: &str, is_error: bool) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.tool_errors.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(agent, tool, is_error, "tool call");
    }

    pub fn record_handoff(&self, specialist: &str) {
        self.handoffs.fetch_add(1, Ordering::Relaxed);
        info!(specialist, "handoff");
    }

    pub fn record_failure(&self, agent: &str, reason: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(agent, reason, "agent failure");
    }

    /// Close the run and emit its summary
    pub fn flush(self, resolved: bool) -> RunSummary {
        let summary = RunSummary {
            run_id: self.run_id,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            model_calls: self.model_calls.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_errors: self.tool_errors.load(Ordering::Relaxed),
            handoffs: self.handoffs.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            resolved,
        };

        self.span.in_scope(|| {
            info!(
                elapsed_ms = summary.elapsed_ms,
                model_calls = summary.model_calls,
                tool_calls = summary.tool_calls,
                tool_errors = summary.tool_errors,
                handoffs = summary.handoffs,
                failures = summary.failures,
                resolved,
                "Run finished"
            );
        });

        summary
    }
}

impl Default for RunObserver {
    fn default() -> Self {
        Self::open()
    }
}

/// Counters of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub elapsed_ms: u64,
    /// Reasoning turns of the supervisor and specialists. Model calls made
    /// inside a tool, such as LogQL generation, are not counted.
    pub model_calls: usize,
    pub tool_calls: usize,
    pub tool_errors: usize,
    pub handoffs: usize,
    pub failures: usize,
    pub resolved: bool,
}
