//! Persistent REPL session behavior.

use pretty_assertions::assert_eq;
use viro::{CollectSink, NoSink, NoopTracer, ReplSession, Value};

fn execute(session: &mut ReplSession, source: &str) -> Result<Value, viro::Error> {
    let mut out = NoSink;
    let mut err = NoSink;
    let mut tracer = NoopTracer;
    session.execute(source, &mut out, &mut err, &mut tracer)
}

#[test]
fn bindings_persist_across_snippets() {
    let mut session = ReplSession::new(vec![]);
    execute(&mut session, "x: 1").expect("binds x");
    let value = execute(&mut session, "x + 1").expect("x is still bound");
    assert_eq!(session.form(&value), "2");
}

#[test]
fn functions_persist_across_snippets() {
    let mut session = ReplSession::new(vec![]);
    execute(&mut session, "double: func [n] [n * 2]").expect("defines double");
    let value = execute(&mut session, "double 21").expect("calls double");
    assert_eq!(session.form(&value), "42");
}

#[test]
fn objects_persist_across_snippets() {
    let mut session = ReplSession::new(vec![]);
    execute(&mut session, "o: make object! [count: 0]").expect("makes o");
    execute(&mut session, "o.count: o.count + 1").expect("bumps count");
    let value = execute(&mut session, "o.count").expect("reads count");
    assert_eq!(session.form(&value), "1");
}

#[test]
fn unclosed_input_requests_continuation() {
    let mut session = ReplSession::new(vec![]);
    let error = execute(&mut session, "b: [1 2").expect_err("block is unclosed");
    assert!(ReplSession::needs_continuation(&error));

    let value = execute(&mut session, "b: [1 2\n3] length? b").expect("completed snippet runs");
    assert_eq!(session.form(&value), "3");
}

#[test]
fn continuation_signals_cover_parens_and_strings() {
    let mut session = ReplSession::new(vec![]);
    let error = execute(&mut session, "(1 2").expect_err("paren is unclosed");
    assert!(ReplSession::needs_continuation(&error));
    let error = execute(&mut session, "{brace").expect_err("string is unclosed");
    assert!(ReplSession::needs_continuation(&error));
}

#[test]
fn evaluation_errors_are_not_continuations() {
    let mut session = ReplSession::new(vec![]);
    let error = execute(&mut session, "nope").expect_err("unbound word");
    assert!(!ReplSession::needs_continuation(&error));
    let error = execute(&mut session, "1]").expect_err("stray bracket");
    assert!(!ReplSession::needs_continuation(&error));
}

#[test]
fn errors_do_not_poison_the_session() {
    let mut session = ReplSession::new(vec![]);
    execute(&mut session, "x: 5").expect("binds x");
    execute(&mut session, "1 / 0").expect_err("division fails");
    let value = execute(&mut session, "x").expect("x survived the error");
    assert_eq!(session.form(&value), "5");
}

#[test]
fn output_is_captured_per_execute() {
    let mut session = ReplSession::new(vec![]);
    let mut out = CollectSink::new();
    let mut err = NoSink;
    let mut tracer = NoopTracer;
    session
        .execute("print \"hello\" print \"world\"", &mut out, &mut err, &mut tracer)
        .expect("prints");
    assert_eq!(out.output(), "hello\nworld\n");
}

#[test]
fn system_args_are_seeded_once() {
    let mut session = ReplSession::new(vec!["one".to_owned()]);
    let value = execute(&mut session, "system.args.1").expect("reads args");
    assert_eq!(session.form(&value), "one");
}
