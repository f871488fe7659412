//! Error taxonomy, annotation, and formatting.

use std::{thread, time::Duration};

use pretty_assertions::assert_eq;
use viro::{Error, ErrorId, ErrorKind, Runner};

fn eval_err(source: &str) -> Error {
    Runner::new(source, vec![])
        .expect("source parses")
        .run_quiet()
        .expect_err("source fails")
}

#[test]
fn missing_arguments_report_name_expected_and_got() {
    let error = eval_err("add 1");
    assert_eq!(error.kind, ErrorKind::Script);
    assert_eq!(error.id, ErrorId::ArgCount);
    assert_eq!(error.args.as_slice(), ["add".to_owned(), "2".to_owned(), "1".to_owned()]);
}

#[test]
fn unbound_words_have_no_value() {
    let error = eval_err("nope");
    assert_eq!(error.id, ErrorId::NoValue);
    assert_eq!(error.args.as_slice(), ["nope".to_owned()]);
}

#[test]
fn set_word_without_a_value() {
    let error = eval_err("x:");
    assert_eq!(error.id, ErrorId::NoValue);
    assert_eq!(error.args.as_slice(), ["x:".to_owned()]);
}

#[test]
fn division_by_zero_is_a_math_error() {
    let error = eval_err("1 / 0");
    assert_eq!(error.kind, ErrorKind::Math);
    assert_eq!(error.id, ErrorId::DivByZero);
    assert_eq!(error.exit_category().code(), 1);
}

#[test]
fn duplicate_refinements_are_rejected() {
    let error = eval_err("f: func [a --flag] [a] f --flag --flag 1");
    assert_eq!(error.id, ErrorId::InvalidOperation);
    assert!(error.message().contains("Duplicate"), "message: {}", error.message());
}

#[test]
fn unknown_refinements_are_rejected() {
    let error = eval_err("f: func [a] [a] f --mystery 1");
    assert_eq!(error.id, ErrorId::InvalidOperation);
    assert!(error.message().contains("--mystery"), "message: {}", error.message());
}

#[test]
fn actions_without_an_implementation_for_the_tag() {
    let error = eval_err("first 5");
    assert_eq!(error.id, ErrorId::ActionNoImpl);
    assert_eq!(error.args.as_slice(), ["first".to_owned(), "integer!".to_owned()]);

    let error = eval_err("append \"x\" \"y\"");
    assert_eq!(error.id, ErrorId::ActionNoImpl);
}

#[test]
fn near_marks_the_failing_token() {
    let error = eval_err("1 2 boom 3");
    let near = error.near.expect("near is annotated");
    assert_eq!(near, "1 2 ^boom 3");
}

#[test]
fn near_is_stable_across_runs() {
    let first = eval_err("x: 1 x + nope");
    let second = eval_err("x: 1 x + nope");
    assert_eq!(first.near, second.near);
    assert_eq!(first.where_, second.where_);
}

#[test]
fn where_lists_calls_outermost_first() {
    let error = eval_err("inner: func [] [boom] outer: func [] [inner] outer");
    assert_eq!(error.where_, vec!["outer".to_owned(), "inner".to_owned()]);
}

#[test]
fn recursion_limit_raises_stack_overflow() {
    let mut runner = Runner::new("f: func [] [f] f", vec![]).expect("parses");
    runner.set_max_depth(64);
    let error = runner.run_quiet().expect_err("recursion exceeds the limit");
    assert_eq!(error.kind, ErrorKind::Internal);
    assert_eq!(error.id, ErrorId::StackOverflow);
    assert_eq!(error.exit_category().code(), 70);
}

#[test]
fn interrupt_flag_stops_evaluation() {
    let mut runner = Runner::new("i: 0 while [true] [i: i + 1]", vec![]).expect("parses");
    let flag = runner.interrupt_handle();
    let setter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        flag.store(true, std::sync::atomic::Ordering::Relaxed);
    });
    let error = runner.run_quiet().expect_err("interrupted");
    setter.join().expect("setter thread joins");
    assert_eq!(error.kind, ErrorKind::Internal);
    assert_eq!(error.id, ErrorId::Interrupt);
    assert_eq!(error.exit_category().code(), 130);
}

#[test]
fn human_line_and_json_record_agree() {
    let error = eval_err("add 1");
    let text = error.to_string();
    assert!(text.starts_with("Script Error: add is missing arguments (expected 2, got 1)"));
    assert!(text.contains("near: "));

    let record = error.to_json();
    assert_eq!(record["kind"], "script");
    assert_eq!(record["id"], "arg-count");
    assert_eq!(record["message"], "add is missing arguments (expected 2, got 1)");
    assert_eq!(record["near"], serde_json::json!(error.near));
}

#[test]
fn syntax_errors_map_to_exit_code_two() {
    let error = Runner::new("[1 2", vec![]).expect_err("unclosed block");
    assert_eq!(error.kind, ErrorKind::Syntax);
    assert_eq!(error.id, ErrorId::UnclosedBlock);
    assert_eq!(error.exit_category().code(), 2);
}

#[test]
fn errors_inside_nested_blocks_are_annotated_where_they_happen() {
    let error = eval_err("if true [1 / 0]");
    assert_eq!(error.id, ErrorId::DivByZero);
    let near = error.near.expect("near is annotated");
    assert!(near.contains('^'), "near: {near}");
}
