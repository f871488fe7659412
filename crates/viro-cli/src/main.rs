//! The `viro` command: script execution and the interactive REPL.
//!
//! Exit codes: 0 success, 1 script/math error, 2 syntax error, 3 access
//! error, 64 usage, 70 internal error, 130 interrupt.

use std::{
    io::{self, Write},
    process::ExitCode,
};

use viro::{
    Error, EvalTracer, ExitCategory, NoopTracer, ReplSession, StdSink, StderrSink, StderrTracer, Value,
};

struct Options {
    trace: bool,
    json_errors: bool,
    script: Option<String>,
    script_args: Vec<String>,
}

fn main() -> ExitCode {
    let options = match parse_options(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: viro [--trace] [--json-errors] [script [args...]]");
            return ExitCode::from(ExitCategory::Usage.code());
        }
    };

    match &options.script {
        Some(path) => run_script(path, &options),
        None => run_repl(&options),
    }
}

fn parse_options(args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        trace: false,
        json_errors: false,
        script: None,
        script_args: Vec::new(),
    };
    for arg in args {
        if options.script.is_some() {
            options.script_args.push(arg);
        } else {
            match arg.as_str() {
                "--trace" => options.trace = true,
                "--json-errors" => options.json_errors = true,
                "--help" | "-h" => return Err("viro: a REBOL-inspired scripting language".to_owned()),
                flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
                _ => options.script = Some(arg),
            }
        }
    }
    Ok(options)
}

fn report_error(error: &Error, json: bool) {
    if json {
        eprintln!("{}", error.to_json());
    } else {
        eprintln!("{error}");
    }
}

fn run_script(path: &str, options: &Options) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::from(ExitCategory::Usage.code());
        }
    };

    let mut session = ReplSession::new(options.script_args.clone());
    install_interrupt(&session);

    let mut out = StdSink::new();
    let mut err = StderrSink;
    let mut noop = NoopTracer;
    let mut stderr_tracer = StderrTracer::new();
    let tracer: &mut dyn EvalTracer = if options.trace { &mut stderr_tracer } else { &mut noop };

    match session.execute(&source, &mut out, &mut err, tracer) {
        Ok(_) => ExitCode::from(ExitCategory::Success.code()),
        Err(error) => {
            report_error(&error, options.json_errors);
            ExitCode::from(error.exit_category().code())
        }
    }
}

fn run_repl(options: &Options) -> ExitCode {
    let mut session = ReplSession::new(options.script_args.clone());
    install_interrupt(&session);

    let mut source = String::new();
    loop {
        let prompt = if source.is_empty() { ">> " } else { "   " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if source.is_empty() && line.trim().is_empty() {
            continue;
        }
        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        let mut out = StdSink::new();
        let mut err = StderrSink;
        let mut noop = NoopTracer;
        let mut stderr_tracer = StderrTracer::new();
        let tracer: &mut dyn EvalTracer = if options.trace { &mut stderr_tracer } else { &mut noop };

        match session.execute(&source, &mut out, &mut err, tracer) {
            Ok(value) => {
                drop(out);
                if !matches!(value, Value::None) {
                    println!("== {}", session.mold(&value));
                }
            }
            Err(error) if ReplSession::needs_continuation(&error) => continue,
            Err(error) => {
                drop(out);
                report_error(&error, options.json_errors);
            }
        }
        source.clear();
    }

    ExitCode::from(ExitCategory::Success.code())
}

/// Routes Ctrl-C to the evaluator's interrupt flag. The engine raises
/// `internal/interrupt` at the next sequence step.
fn install_interrupt(session: &ReplSession) {
    let flag = session.interrupt_handle();
    if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, flag) {
        eprintln!("warning: could not install interrupt handler: {err}");
    }
}

/// Reads one line from stdin after printing a prompt.
///
/// Returns `None` on EOF (Ctrl+D).
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
