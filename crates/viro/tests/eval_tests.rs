//! End-to-end evaluation tests driven through the public `Runner` interface.

use pretty_assertions::assert_eq;
use viro::{CollectSink, NoSink, NoopTracer, Runner, Value};

fn eval_form(source: &str) -> String {
    let mut runner = Runner::new(source, vec![]).expect("source parses");
    let value = runner.run_quiet().expect("source evaluates");
    runner.form(&value)
}

fn eval_mold(source: &str) -> String {
    let mut runner = Runner::new(source, vec![]).expect("source parses");
    let value = runner.run_quiet().expect("source evaluates");
    runner.mold(&value)
}

fn eval_output(source: &str) -> String {
    let mut runner = Runner::new(source, vec![]).expect("source parses");
    let mut out = CollectSink::new();
    let mut err = NoSink;
    let mut tracer = NoopTracer;
    runner.run(&mut out, &mut err, &mut tracer).expect("source evaluates");
    out.into_output()
}

#[test]
fn infix_addition() {
    assert_eq!(eval_form("3 + 4"), "7");
}

#[test]
fn prefix_and_infix_agree() {
    assert_eq!(eval_form("add 3 4"), eval_form("3 + 4"));
    assert_eq!(eval_form("(add 3 4)"), "7");
    assert_eq!(eval_form("subtract 10 4"), eval_form("10 - 4"));
    assert_eq!(eval_form("multiply 6 7"), eval_form("6 * 7"));
}

#[test]
fn set_words_bind_and_resolve() {
    assert_eq!(eval_form("x: 10 y: 20 x + y"), "30");
}

#[test]
fn set_word_consumes_a_full_expression() {
    assert_eq!(eval_form("x: 1 + 2 x"), "3");
}

#[test]
fn chained_set_words() {
    assert_eq!(eval_form("x: y: 5 x + y"), "10");
}

#[test]
fn empty_program_is_none() {
    assert_eq!(eval_form(""), "none");
}

#[test]
fn sequence_of_literals_yields_the_last() {
    assert_eq!(eval_form("1 2 3"), "3");
    assert_eq!(eval_form("\"a\" \"b\""), "b");
}

#[test]
fn literals_evaluate_to_themselves() {
    assert_eq!(eval_form("none"), "none");
    assert_eq!(eval_form("true"), "true");
    assert_eq!(eval_form("1.5"), "1.5");
    assert_eq!(eval_mold("[1 2 3]"), "[1 2 3]");
    assert_eq!(eval_mold("#{CAFE}"), "#{CAFE}");
}

#[test]
fn paren_evaluates_eagerly() {
    assert_eq!(eval_form("x: (1 + 2) x"), "3");
    assert_eq!(eval_form("(1 2 3)"), "3");
}

#[test]
fn lit_word_yields_the_plain_word() {
    assert_eq!(eval_form("'foo"), "foo");
}

#[test]
fn get_word_fetches_without_invoking() {
    assert_eq!(eval_form("f: :add f 1 2"), "3");
}

#[test]
fn blocks_are_shared_by_reference() {
    assert_eq!(eval_form("b: [1 2] c: b append b 3 length? c"), "3");
}

#[test]
fn user_function_call_and_value() {
    assert_eq!(eval_form("f: func [n] [n + 1] f 41"), "42");
    // A user function as the final expression is a value, not a call.
    assert_eq!(eval_mold("f: func [n] [n + 1] f"), "func [n] [n + 1]");
}

#[test]
fn function_adopts_the_set_word_name() {
    assert_eq!(eval_mold("f: func [n] [n] type? :f"), "function!");
    let err = Runner::new("f: func [] [boom] f", vec![])
        .expect("parses")
        .run_quiet()
        .expect_err("boom is unbound");
    assert_eq!(err.where_, vec!["f".to_owned()]);
}

#[test]
fn closures_capture_their_definition_frame() {
    assert_eq!(eval_form("make-adder: func [n] [func [m] [m + n]] add5: make-adder 5 add5 2"), "7");
}

#[test]
fn recursive_functions() {
    assert_eq!(
        eval_form("fact: func [n] [either n < 2 [1] [n * fact n - 1]] fact 5"),
        "120"
    );
}

#[test]
fn return_exits_the_function_early() {
    assert_eq!(eval_form("f: func [n] [if n > 0 [return 99] 1] f 5"), "99");
    assert_eq!(eval_form("f: func [n] [if n > 0 [return 99] 1] f 0"), "1");
}

#[test]
fn flag_refinements() {
    let program = "f: func [a --double] [either double [a * 2] [a]] ";
    assert_eq!(eval_form(&format!("{program} f 3")), "3");
    assert_eq!(eval_form(&format!("{program} f --double 3")), "6");
    // Refinements interleave freely with positional arguments.
    assert_eq!(eval_form(&format!("{program} f 3 --double")), "6");
}

#[test]
fn value_refinements_default_to_none() {
    let program = "g: func [a --scale factor] [either scale [a * scale] [a]] ";
    assert_eq!(eval_form(&format!("{program} g 3")), "3");
    assert_eq!(eval_form(&format!("{program} g --scale 10 3")), "30");
}

#[test]
fn infix_user_functions() {
    assert_eq!(eval_form("mul: func --infix [a b] [a * b] 3 mul 4"), "12");
}

#[test]
fn control_flow() {
    assert_eq!(eval_form("if true [1]"), "1");
    assert_eq!(eval_form("if false [1]"), "none");
    assert_eq!(eval_form("either 1 < 2 [\"yes\"] [\"no\"]"), "yes");
    assert_eq!(eval_form("i: 0 while [i < 5] [i: i + 1] i"), "5");
    assert_eq!(eval_form("total: 0 loop 4 [total: total + 2] total"), "8");
}

#[test]
fn comparisons_and_logic() {
    assert_eq!(eval_form("1 < 2"), "true");
    assert_eq!(eval_form("2 <= 2"), "true");
    assert_eq!(eval_form("3 > 4"), "false");
    assert_eq!(eval_form("1 = 1"), "true");
    assert_eq!(eval_form("1 = 1.0"), "false");
    assert_eq!(eval_form("1 <> 2"), "true");
    assert_eq!(eval_form("true and false"), "false");
    assert_eq!(eval_form("true or false"), "true");
    assert_eq!(eval_form("not none"), "true");
}

#[test]
fn division_is_exact_when_possible() {
    assert_eq!(eval_form("6 / 2"), "3");
    assert_eq!(eval_form("5 / 2"), "2.5");
    assert_eq!(eval_form("modulo 7 3"), "1");
}

#[test]
fn mixed_numerics_promote_to_decimal() {
    assert_eq!(eval_form("1 + 0.5"), "1.5");
    assert_eq!(eval_form("2.0 * 3"), "6.0");
}

#[test]
fn series_actions_dispatch_by_tag() {
    assert_eq!(eval_form("first [a b c]"), "a");
    assert_eq!(eval_form("last [a b c]"), "c");
    assert_eq!(eval_form("length? [1 2 3]"), "3");
    assert_eq!(eval_form("pick [a b c] 2"), "b");
    assert_eq!(eval_form("pick [a b c] 9"), "none");
    assert_eq!(eval_form("first \"hello\""), "h");
    assert_eq!(eval_form("length? \"hello\""), "5");
    assert_eq!(eval_mold("append [1 2] 3"), "[1 2 3]");
}

#[test]
fn make_object_and_prototype_delegation() {
    assert_eq!(eval_form("obj: make object! [a: 1 b: 2] obj.a + obj.b"), "3");
    assert_eq!(eval_form("base: make object! [a: 1] child: make base [b: 2] child.a + child.b"), "3");
}

#[test]
fn reduce_and_quote() {
    assert_eq!(eval_mold("reduce [1 + 2 3]"), "[3 3]");
    assert_eq!(eval_mold("quote (1 + 2)"), "(1 + 2)");
}

#[test]
fn do_evaluates_blocks_and_strings() {
    assert_eq!(eval_form("do [1 + 2]"), "3");
    assert_eq!(eval_form("do \"3 + 4\""), "7");
    assert_eq!(eval_form("do 5"), "5");
}

#[test]
fn print_reduces_blocks_and_forms_values() {
    assert_eq!(eval_output("print [1 + 2 3]"), "3 3\n");
    assert_eq!(eval_output("prin \"x\" prin \"y\""), "xy");
    assert_eq!(eval_output("print \"hi\""), "hi\n");
}

#[test]
fn get_and_set_operate_on_words() {
    assert_eq!(eval_form("set 'x 5 get 'x"), "5");
}

#[test]
fn type_of_values() {
    assert_eq!(eval_form("type? 3"), "integer!");
    assert_eq!(eval_form("type? \"s\""), "string!");
    assert_eq!(eval_form("type? [1]"), "block!");
    assert_eq!(eval_form("type? none"), "none!");
    assert_eq!(eval_form("type? object!"), "datatype!");
}

#[test]
fn system_object_carries_driver_args() {
    let mut runner = Runner::new("length? system.args", vec!["a".to_owned(), "b".to_owned()]).expect("parses");
    let value = runner.run_quiet().expect("evaluates");
    assert_eq!(runner.form(&value), "2");

    let mut runner = Runner::new("system.args.1", vec!["alpha".to_owned()]).expect("parses");
    let value = runner.run_quiet().expect("evaluates");
    assert_eq!(runner.form(&value), "alpha");
}

#[test]
fn runner_reruns_against_accumulated_state() {
    let mut runner = Runner::new("counter: counter + 1", vec![]).expect("parses");
    runner
        .run_quiet()
        .expect_err("counter is unbound on the first run");
    // Bind it through a fresh runner and re-run twice to see state persist.
    let mut runner = Runner::new("counter: 0", vec![]).expect("parses");
    let value = runner.run_quiet().expect("evaluates");
    assert!(matches!(value, Value::Int(0)));
    let value = runner.run_quiet().expect("evaluates again");
    assert!(matches!(value, Value::Int(0)));
}

#[test]
fn extended_control_flow() {
    assert_eq!(eval_form("unless false [7]"), "7");
    assert_eq!(eval_form("unless true [7]"), "none");
    assert_eq!(eval_form("i: 0 until [i: i + 1 i > 3]"), "true");
    assert_eq!(eval_form("total: 0 repeat i 4 [total: total + i] total"), "10");
    assert_eq!(eval_form("total: 0 foreach n [1 2 3] [total: total + n] total"), "6");
    assert_eq!(eval_form("out: \"\" foreach c \"ab\" [out: c] out"), "b");
    assert_eq!(eval_form("case [false [1] true [2]]"), "2");
    assert_eq!(eval_form("case [false [1]]"), "none");
    assert_eq!(eval_form("all [1 2 3]"), "3");
    assert_eq!(eval_form("all [1 none 3]"), "none");
    assert_eq!(eval_form("any [none false 5]"), "5");
    assert_eq!(eval_form("any [none false]"), "none");
}

#[test]
fn extended_math() {
    assert_eq!(eval_form("negate 5"), "-5");
    assert_eq!(eval_form("absolute -3"), "3");
    assert_eq!(eval_form("min 2 7"), "2");
    assert_eq!(eval_form("max 2 7"), "7");
    assert_eq!(eval_form("max 2.5 2"), "2.5");
    assert_eq!(eval_form("zero? 0"), "true");
    assert_eq!(eval_form("zero? 0.1"), "false");
    assert_eq!(eval_form("even? 4"), "true");
    assert_eq!(eval_form("odd? 4"), "false");
}

#[test]
fn type_predicates_and_conversions() {
    assert_eq!(eval_form("integer? 1"), "true");
    assert_eq!(eval_form("integer? 1.0"), "false");
    assert_eq!(eval_form("string? \"s\""), "true");
    assert_eq!(eval_form("block? [1]"), "true");
    assert_eq!(eval_form("none? none"), "true");
    assert_eq!(eval_form("word? 'a"), "true");
    assert_eq!(eval_form("object? make object! []"), "true");
    assert_eq!(eval_form("function? :add"), "true");
    assert_eq!(eval_form("value? 'add"), "true");
    assert_eq!(eval_form("value? 'missing"), "false");
    assert_eq!(eval_form("to-string 42"), "42");
    assert_eq!(eval_form("to-integer \"17\""), "17");
    assert_eq!(eval_form("to-integer 2.9"), "2");
    assert_eq!(eval_form("to-integer true"), "1");
}

#[test]
fn extended_series_actions() {
    assert_eq!(eval_form("empty? []"), "true");
    assert_eq!(eval_form("empty? [1]"), "false");
    assert_eq!(eval_form("empty? \"\""), "true");
    assert_eq!(eval_mold("insert [2 3] 1"), "[1 2 3]");
    // copy produces a fresh series, detached from the original.
    assert_eq!(eval_form("a: [1 2] b: copy a append b 3 length? a"), "2");
    assert_eq!(eval_form("s: \"hi\" t: copy s t"), "hi");
}

#[test]
fn try_materializes_errors_as_objects() {
    assert_eq!(eval_form("e: try [1 / 0] e.id"), "div-by-zero");
    assert_eq!(eval_form("e: try [1 / 0] e.kind"), "math");
    assert_eq!(eval_form("try [5]"), "5");
}
