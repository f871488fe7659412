//! Path evaluation and set-path assignment.

use pretty_assertions::assert_eq;
use viro::{ErrorId, ErrorKind, Runner};

fn eval_form(source: &str) -> String {
    let mut runner = Runner::new(source, vec![]).expect("source parses");
    let value = runner.run_quiet().expect("source evaluates");
    runner.form(&value)
}

fn eval_err(source: &str) -> viro::Error {
    Runner::new(source, vec![])
        .expect("source parses")
        .run_quiet()
        .expect_err("source fails")
}

#[test]
fn indexing_is_one_based() {
    assert_eq!(eval_form("[1 2 3].2"), "2");
    assert_eq!(eval_form("b: [10 20 30] b.1"), "10");
    assert_eq!(eval_form("b: [10 20 30] b.3"), "30");
}

#[test]
fn index_zero_and_past_end_are_out_of_range() {
    assert_eq!(eval_err("[1 2 3].0").id, ErrorId::IndexOutOfRange);
    assert_eq!(eval_err("[1 2 3].4").id, ErrorId::IndexOutOfRange);
}

#[test]
fn object_field_read_and_write() {
    assert_eq!(eval_form("obj: make object! [a: 1 b: 2] obj.a: 99 obj.a"), "99");
    assert_eq!(eval_form("obj: make object! [a: 1 b: 2] obj.b"), "2");
}

#[test]
fn missing_fields_are_errors_on_read_and_write() {
    assert_eq!(eval_err("obj: make object! [a: 1] obj.c").id, ErrorId::NoSuchField);
    assert_eq!(eval_err("obj: make object! [a: 1] obj.c: 5").id, ErrorId::NoSuchField);
}

#[test]
fn writes_through_a_prototype_stay_local() {
    // Writing a delegated field binds it in the child's own frame; the
    // prototype keeps its value.
    assert_eq!(
        eval_form("base: make object! [a: 1] child: make base [b: 2] child.a: 9 base.a + child.a"),
        "10"
    );
}

#[test]
fn block_element_assignment() {
    assert_eq!(eval_form("b: [1 2 3] b.2: 9 b.2"), "9");
    assert_eq!(eval_err("b: [1 2 3] b.9: 0").id, ErrorId::IndexOutOfRange);
}

#[test]
fn nested_paths() {
    assert_eq!(eval_form("o: make object! [inner: make object! [x: 1]] o.inner.x"), "1");
    assert_eq!(eval_form("o: make object! [inner: make object! [x: 1]] o.inner.x: 5 o.inner.x"), "5");
    assert_eq!(eval_form("o: make object! [items: [10 20]] o.items.2"), "20");
}

#[test]
fn path_through_none_fails() {
    let error = eval_err("n: none n.x");
    assert_eq!(error.id, ErrorId::NonePath);
    assert_eq!(eval_err("none.x").id, ErrorId::NonePath);
}

#[test]
fn literal_number_heads_read_as_type_mismatch_write_as_immutable() {
    assert_eq!(eval_err("1.field").id, ErrorId::PathTypeMismatch);
    assert_eq!(eval_err("1.field: 5").id, ErrorId::ImmutableTarget);
}

#[test]
fn field_access_on_non_objects_is_a_type_mismatch() {
    assert_eq!(eval_err("b: [1 2] b.x").id, ErrorId::PathTypeMismatch);
    assert_eq!(eval_err("s: \"ab\" s.x").id, ErrorId::PathTypeMismatch);
}

#[test]
fn string_paths_yield_one_rune_strings() {
    assert_eq!(eval_form("s: \"abc\" s.2"), "b");
    assert_eq!(eval_err("s: \"abc\" s.4").id, ErrorId::IndexOutOfRange);
    // Strings are immutable; element writes are rejected.
    assert_eq!(eval_err("s: \"abc\" s.1: \"z\"").id, ErrorId::ImmutableTarget);
}

#[test]
fn path_reads_are_idempotent() {
    assert_eq!(
        eval_form("obj: make object! [a: 7] x: obj.a y: obj.a x + y"),
        "14"
    );
}

#[test]
fn unbound_path_base() {
    let error = eval_err("ghost.field");
    assert_eq!(error.id, ErrorId::NoValue);
    assert_eq!(error.kind, ErrorKind::Script);
}
