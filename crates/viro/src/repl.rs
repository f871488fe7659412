//! Persistent REPL session support.
//!
//! `ReplSession` keeps interpreter state across `execute()` calls so
//! interactive snippets share bindings, functions, and objects. Continuation
//! is driven by the reader's own error ids: an unclosed block, paren, or
//! string (or a bare end-of-input) means the driver should request another
//! line instead of reporting the error.

use std::sync::{Arc, atomic::AtomicBool};

use crate::{
    error::{Error, ErrorId, Raise},
    eval::{Evaluator, Interp},
    io::OutputSink,
    parse,
    run::seed_system,
    tracer::EvalTracer,
    value::Value,
};

/// A persistent session evaluating source snippets against accumulated
/// interpreter state.
#[derive(Debug)]
pub struct ReplSession {
    interp: Interp,
}

impl ReplSession {
    /// Creates a session with the native library installed and `system`
    /// seeded from `script_args`.
    #[must_use]
    pub fn new(script_args: Vec<String>) -> Self {
        let mut interp = Interp::new();
        seed_system(&mut interp, script_args);
        Self { interp }
    }

    /// Shared cancellation flag for the driver's signal handler.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interp.interrupt_handle()
    }

    /// Overrides the recursion limit.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.interp.set_max_depth(max_depth);
    }

    /// Parses and evaluates one snippet. Bindings persist to the next call.
    ///
    /// # Errors
    /// Returns the reader's syntax error or the first unhandled evaluation
    /// error. Check [`needs_continuation`](Self::needs_continuation) before
    /// reporting.
    pub fn execute(
        &mut self,
        source: &str,
        out: &mut dyn OutputSink,
        err: &mut dyn OutputSink,
        tracer: &mut dyn EvalTracer,
    ) -> Result<Value, Error> {
        self.interp.clear_interrupt();
        let program = parse::parse_source(source, &mut self.interp.symbols)?;
        let mut evaluator = Evaluator::new(&mut self.interp, out, err, tracer);
        match evaluator.eval_sequence(&program) {
            Ok(value) | Err(Raise::Return(value)) => Ok(value),
            Err(Raise::Error(error)) => Err(*error),
        }
    }

    /// Whether an error signals that the snippet is merely incomplete and the
    /// driver should read another line.
    #[must_use]
    pub fn needs_continuation(error: &Error) -> bool {
        matches!(
            error.id,
            ErrorId::UnclosedBlock | ErrorId::UnclosedParen | ErrorId::UnclosedString | ErrorId::UnexpectedEof
        )
    }

    /// Human form of a value under this session's symbol table.
    #[must_use]
    pub fn form(&self, value: &Value) -> String {
        value.form(&self.interp.symbols, &self.interp.frames)
    }

    /// Source-like form of a value under this session's symbol table.
    #[must_use]
    pub fn mold(&self, value: &Value) -> String {
        value.mold(&self.interp.symbols, &self.interp.frames)
    }
}
