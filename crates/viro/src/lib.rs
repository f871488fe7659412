//! Viro: a homoiconic, REBOL-inspired scripting language.
//!
//! Programs are themselves sequences of values that the interpreter evaluates
//! in place; there is no compilation phase and no AST distinct from data. The
//! crate provides the value model, the binding-frame system, the tree-walking
//! evaluator, the surface reader, the native library, and persistent REPL
//! sessions. Drivers inject output sinks and an optional tracer per run.
//!
//! ```
//! use viro::Runner;
//!
//! let mut runner = Runner::new("3 + 4", vec![]).unwrap();
//! let result = runner.run_quiet().unwrap();
//! assert_eq!(runner.form(&result), "7");
//! ```

mod error;
mod eval;
mod frame;
mod intern;
mod io;
mod natives;
mod parse;
mod repl;
mod run;
mod store;
mod tracer;
mod value;

pub use crate::{
    error::{Error, ErrorId, ErrorKind, ExitCategory, Raise, RunResult},
    eval::{Args, DEFAULT_MAX_RECURSION_DEPTH, Evaluator, Interp, Refinements},
    frame::{Frame, FrameId, FrameKind, ROOT_FRAME},
    intern::{Sym, SymbolTable},
    io::{CollectSink, NoSink, OutputSink, StdSink, StderrSink},
    parse::parse_source,
    repl::ReplSession,
    run::Runner,
    store::FrameStore,
    tracer::{EvalTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    value::{Action, BlockRef, FuncImpl, Function, NativeImpl, ObjectValue, Param, PortHandle, Tag, Value},
};
