//! Public interface for running Viro code.

use std::sync::{Arc, atomic::AtomicBool};

use crate::{
    error::{Error, Raise},
    eval::{Evaluator, Interp},
    frame::{Frame, FrameKind, ROOT_FRAME},
    io::{NoSink, OutputSink, StdSink, StderrSink},
    parse,
    tracer::{EvalTracer, NoopTracer},
    value::{ObjectValue, Value},
};

/// Seeds the top-level `system` object: `system.args` holds the script
/// arguments supplied by the driver, `system.version` the interpreter
/// version. Must run before evaluation begins.
pub(crate) fn seed_system(interp: &mut Interp, script_args: Vec<String>) {
    let mut frame = Frame::new(FrameKind::Object, Some(ROOT_FRAME));
    let args_sym = interp.symbols.intern("args");
    let version_sym = interp.symbols.intern("version");
    let args = script_args.into_iter().map(|s| Value::string(&s)).collect();
    frame.bind(args_sym, Value::block(args));
    frame.bind(version_sym, Value::string(env!("CARGO_PKG_VERSION")));
    let id = interp.frames.register(frame);
    interp.frames.mark_captured(id);

    let system_sym = interp.symbols.intern("system");
    interp
        .frames
        .bind_root(system_sym, Value::Object(std::rc::Rc::new(ObjectValue { frame: id, proto: None })));
}

/// Parses a script once and evaluates it against a fresh interpreter.
///
/// # Example
/// ```
/// use viro::Runner;
///
/// let mut runner = Runner::new("x: 41 x + 1", vec![]).unwrap();
/// let result = runner.run_default().unwrap();
/// assert_eq!(runner.form(&result), "42");
/// ```
#[derive(Debug)]
pub struct Runner {
    interp: Interp,
    program: Vec<Value>,
}

impl Runner {
    /// Parses the given source. The interpreter is created with the native
    /// library installed and `system` seeded from `script_args`.
    ///
    /// # Errors
    /// Returns a syntax error if the source cannot be read.
    pub fn new(source: &str, script_args: Vec<String>) -> Result<Self, Error> {
        let mut interp = Interp::new();
        seed_system(&mut interp, script_args);
        let program = parse::parse_source(source, &mut interp.symbols)?;
        Ok(Self { interp, program })
    }

    /// Shared cancellation flag for the driver's signal handler.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interp.interrupt_handle()
    }

    /// Overrides the recursion limit, mainly for tests.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.interp.set_max_depth(max_depth);
    }

    /// Evaluates the parsed program with caller-supplied sinks and tracer.
    ///
    /// A top-level `return` is treated as a normal result. Running the same
    /// `Runner` again re-evaluates against the accumulated interpreter state.
    pub fn run(
        &mut self,
        out: &mut dyn OutputSink,
        err: &mut dyn OutputSink,
        tracer: &mut dyn EvalTracer,
    ) -> Result<Value, Error> {
        self.interp.clear_interrupt();
        let program = self.program.clone();
        let mut evaluator = Evaluator::new(&mut self.interp, out, err, tracer);
        match evaluator.eval_sequence(&program) {
            Ok(value) | Err(Raise::Return(value)) => Ok(value),
            Err(Raise::Error(error)) => Err(*error),
        }
    }

    /// Evaluates with stdout/stderr sinks and no tracing.
    pub fn run_default(&mut self) -> Result<Value, Error> {
        let mut out = StdSink::new();
        let mut err = StderrSink;
        let mut tracer = NoopTracer;
        self.run(&mut out, &mut err, &mut tracer)
    }

    /// Evaluates quietly, discarding all output.
    pub fn run_quiet(&mut self) -> Result<Value, Error> {
        let mut out = NoSink;
        let mut err = NoSink;
        let mut tracer = NoopTracer;
        self.run(&mut out, &mut err, &mut tracer)
    }

    /// Human form of a value under this runner's symbol table.
    #[must_use]
    pub fn form(&self, value: &Value) -> String {
        value.form(&self.interp.symbols, &self.interp.frames)
    }

    /// Source-like form of a value under this runner's symbol table.
    #[must_use]
    pub fn mold(&self, value: &Value) -> String {
        value.mold(&self.interp.symbols, &self.interp.frames)
    }
}
