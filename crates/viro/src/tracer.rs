//! Evaluation tracing infrastructure.
//!
//! A trait-based tracing system for the evaluator. All hooks have default
//! no-op bodies, so [`NoopTracer`] costs nothing beyond a branch on
//! [`EvalTracer::enabled`], which the engine checks before forming result
//! strings. The engine treats the tracer as write-only.

use std::time::{SystemTime, UNIX_EPOCH};

/// One dispatch recorded by the engine.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TraceEvent {
    /// Wall-clock capture time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u128,
    /// The word being evaluated at the traced position, if any.
    pub word: Option<String>,
    /// Form of the produced value.
    pub result: String,
    /// Time spent in the dispatch.
    pub elapsed_ns: u128,
    /// Recursion depth at the time of dispatch.
    pub depth: usize,
}

impl TraceEvent {
    #[must_use]
    pub fn new(word: Option<String>, result: String, elapsed_ns: u128, depth: usize) -> Self {
        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        Self {
            timestamp_ns,
            word,
            result,
            elapsed_ns,
            depth,
        }
    }
}

/// Trait for evaluation tracing.
///
/// The engine calls [`enabled`](Self::enabled) first and skips event
/// construction entirely when it returns false, so forming result strings is
/// only paid for when a real tracer is attached.
pub trait EvalTracer: std::fmt::Debug {
    /// Whether the engine should construct and emit events at all.
    fn enabled(&self) -> bool {
        false
    }

    /// Called after each traced dispatch with the recorded event.
    fn on_eval(&mut self, _event: TraceEvent) {}

    /// Called when a call pushes a display name onto the call-name stack.
    fn on_call(&mut self, _name: &str, _depth: usize) {}

    /// Called when a call pops its display name.
    fn on_return(&mut self, _depth: usize) {}
}

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Tracer that prints a human-readable evaluation log to stderr.
///
/// Output format:
/// ```text
///   [depth 1] add -> 7 (1250ns)
///   [depth 2] n -> 41 (90ns)
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer;

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EvalTracer for StderrTracer {
    fn enabled(&self) -> bool {
        true
    }

    fn on_eval(&mut self, event: TraceEvent) {
        let word = event.word.as_deref().unwrap_or("<value>");
        eprintln!(
            "  [depth {}] {} -> {} ({}ns)",
            event.depth, word, event.result, event.elapsed_ns
        );
    }

    fn on_call(&mut self, name: &str, depth: usize) {
        eprintln!("  >>> call {name} depth={depth}");
    }

    fn on_return(&mut self, depth: usize) {
        eprintln!("  <<< return depth={depth}");
    }
}

/// Tracer that records every event for post-mortem inspection.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl EvalTracer for RecordingTracer {
    fn enabled(&self) -> bool {
        true
    }

    fn on_eval(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}
