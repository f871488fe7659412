//! Control-flow natives: `do`, `if`, `unless`, `either`, `while`, `until`,
//! `loop`, `repeat`, `foreach`, `case`, `all`, `any`, `return`, and `try`.
//!
//! `return` raises the distinguished return signal, which the engine converts
//! back to a normal result at the enclosing function boundary. `try` is the
//! one place an error is deliberately swallowed: it materializes the caught
//! error as an object with `kind`, `id`, and `message` fields.

use std::rc::Rc;

use crate::{
    error::{Error, Raise, RunResult},
    eval::{Args, Evaluator, Interp, Refinements},
    frame::{Frame, FrameKind, ROOT_FRAME},
    natives::{arg, lit, register},
    parse,
    value::{BlockRef, ObjectValue, Value},
};

pub(crate) fn install(interp: &mut Interp) {
    register(interp, "do", &[arg("value")], false, do_native);
    register(interp, "if", &[arg("condition"), arg("then-block")], false, if_native);
    register(interp, "unless", &[arg("condition"), arg("else-block")], false, unless);
    register(
        interp,
        "either",
        &[arg("condition"), arg("then-block"), arg("else-block")],
        false,
        either,
    );
    register(interp, "while", &[arg("cond-block"), arg("body")], false, while_native);
    register(interp, "until", &[arg("body")], false, until);
    register(interp, "loop", &[arg("count"), arg("body")], false, loop_native);
    register(interp, "repeat", &[lit("word"), arg("count"), arg("body")], false, repeat);
    register(interp, "foreach", &[lit("word"), arg("series"), arg("body")], false, foreach);
    register(interp, "case", &[arg("cases")], false, case_native);
    register(interp, "all", &[arg("block")], false, all_native);
    register(interp, "any", &[arg("block")], false, any_native);
    register(interp, "return", &[arg("value")], false, return_native);
    register(interp, "try", &[arg("block")], false, try_native);
}

fn expect_block(name: &str, value: &Value) -> RunResult<BlockRef> {
    value
        .as_block()
        .cloned()
        .ok_or_else(|| Error::invalid_operation(format!("{name} expects a block!")))
}

/// Evaluates a block or a source string; any other value evaluates to itself.
fn do_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("do")?;
    match &value {
        Value::Block(block) => {
            let block = block.clone();
            ev.do_block(&block)
        }
        Value::Str(source) => {
            let items = parse::parse_source(source, &mut ev.interp.symbols)?;
            ev.eval_sequence(&items)
        }
        _ => Ok(value),
    }
}

fn if_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (condition, then_block) = args.into_two("if")?;
    let then_block = expect_block("if", &then_block)?;
    if condition.is_truthy() {
        ev.do_block(&then_block)
    } else {
        Ok(Value::None)
    }
}

fn either(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let mut values = args.into_vec();
    if values.len() != 3 {
        return Err(Error::arg_count("either", 3, values.len()));
    }
    let else_block = expect_block("either", &values.pop().expect("len is 3"))?;
    let then_block = expect_block("either", &values.pop().expect("len is 3"))?;
    let condition = values.pop().expect("len is 3");
    if condition.is_truthy() {
        ev.do_block(&then_block)
    } else {
        ev.do_block(&else_block)
    }
}

/// Evaluates `body` as long as `cond-block` produces a truthy value. Returns
/// the last body result, or `none` if the body never ran.
fn while_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (cond_block, body) = args.into_two("while")?;
    let cond_block = expect_block("while", &cond_block)?;
    let body = expect_block("while", &body)?;
    let mut last = Value::None;
    while ev.do_block(&cond_block)?.is_truthy() {
        last = ev.do_block(&body)?;
    }
    Ok(last)
}

fn loop_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (count, body) = args.into_two("loop")?;
    let Some(count) = count.as_int() else {
        return Err(Error::invalid_operation("loop expects an integer! count"));
    };
    let body = expect_block("loop", &body)?;
    let mut last = Value::None;
    for _ in 0..count.max(0) {
        last = ev.do_block(&body)?;
    }
    Ok(last)
}

/// `unless cond [block]` runs the block only when the condition is falsy.
fn unless(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (condition, else_block) = args.into_two("unless")?;
    let else_block = expect_block("unless", &else_block)?;
    if condition.is_truthy() {
        Ok(Value::None)
    } else {
        ev.do_block(&else_block)
    }
}

/// Evaluates the body until it produces a truthy value; returns that value.
fn until(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let body = expect_block("until", &args.into_one("until")?)?;
    loop {
        let value = ev.do_block(&body)?;
        if value.is_truthy() {
            return Ok(value);
        }
    }
}

/// `repeat 'i count [body]`: binds the counter word to 1..=count in the
/// current frame and runs the body for each value.
fn repeat(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let mut values = args.into_vec();
    if values.len() != 3 {
        return Err(Error::arg_count("repeat", 3, values.len()));
    }
    let body = expect_block("repeat", &values.pop().expect("len is 3"))?;
    let count = values.pop().expect("len is 3");
    let word = values.pop().expect("len is 3");
    let Some(sym) = word.as_word() else {
        return Err(Error::invalid_operation("repeat expects a word! counter"));
    };
    let Some(count) = count.as_int() else {
        return Err(Error::invalid_operation("repeat expects an integer! count"));
    };
    let mut last = Value::None;
    for i in 1..=count.max(0) {
        ev.interp.frames.bind_top(sym, Value::Int(i));
        last = ev.do_block(&body)?;
    }
    Ok(last)
}

/// `foreach 'w series [body]`: binds the word to each element in turn. For
/// strings the element is a one-rune string.
fn foreach(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let mut values = args.into_vec();
    if values.len() != 3 {
        return Err(Error::arg_count("foreach", 3, values.len()));
    }
    let body = expect_block("foreach", &values.pop().expect("len is 3"))?;
    let series = values.pop().expect("len is 3");
    let word = values.pop().expect("len is 3");
    let Some(sym) = word.as_word() else {
        return Err(Error::invalid_operation("foreach expects a word!"));
    };
    let elements: Vec<Value> = match &series {
        Value::Block(items) | Value::Paren(items) => items.borrow().clone(),
        Value::Str(s) => s
            .chars()
            .map(|rune| Value::string(rune.encode_utf8(&mut [0u8; 4])))
            .collect(),
        other => {
            return Err(Error::invalid_operation(format!(
                "foreach cannot iterate a {} value",
                <&str>::from(other.tag())
            )));
        }
    };
    let mut last = Value::None;
    for element in elements {
        ev.interp.frames.bind_top(sym, element);
        last = ev.do_block(&body)?;
    }
    Ok(last)
}

/// `case [cond1 [b1] cond2 [b2] ...]`: evaluates conditions in order and runs
/// the block after the first truthy one.
fn case_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let cases = expect_block("case", &args.into_one("case")?)?;
    let items = cases.borrow().clone();
    let mut i = 0;
    while i < items.len() {
        let (condition, next) = ev.eval_next(&items, i)?;
        let Some(branch) = items.get(next) else {
            return Err(Error::invalid_operation("case expects a block after each condition"));
        };
        let branch = expect_block("case", branch)?;
        if condition.is_truthy() {
            return ev.do_block(&branch);
        }
        i = next + 1;
    }
    Ok(Value::None)
}

/// Evaluates each expression; returns `none` on the first falsy result, the
/// last value otherwise.
fn all_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let block = expect_block("all", &args.into_one("all")?)?;
    let items = block.borrow().clone();
    let mut last = Value::Logic(true);
    let mut i = 0;
    while i < items.len() {
        let (value, next) = ev.eval_next(&items, i)?;
        if !value.is_truthy() {
            return Ok(Value::None);
        }
        last = value;
        i = next;
    }
    Ok(last)
}

/// Evaluates each expression; returns the first truthy result, `none` if all
/// are falsy.
fn any_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let block = expect_block("any", &args.into_one("any")?)?;
    let items = block.borrow().clone();
    let mut i = 0;
    while i < items.len() {
        let (value, next) = ev.eval_next(&items, i)?;
        if value.is_truthy() {
            return Ok(value);
        }
        i = next;
    }
    Ok(Value::None)
}

fn return_native(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("return")?;
    Err(Raise::Return(value))
}

/// Evaluates a block, converting a raised error into an error object with
/// `kind`, `id`, and `message` fields. The return signal passes through.
fn try_native(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let block = expect_block("try", &args.into_one("try")?)?;
    match ev.do_block(&block) {
        Ok(value) => Ok(value),
        Err(Raise::Return(value)) => Err(Raise::Return(value)),
        Err(Raise::Error(error)) => {
            let mut frame = Frame::new(FrameKind::Object, Some(ROOT_FRAME));
            let kind_sym = ev.interp.symbols.intern("kind");
            let id_sym = ev.interp.symbols.intern("id");
            let message_sym = ev.interp.symbols.intern("message");
            frame.bind(kind_sym, Value::string(&<&str>::from(error.kind).to_ascii_lowercase()));
            frame.bind(id_sym, Value::string(<&str>::from(error.id)));
            frame.bind(message_sym, Value::string(&error.message()));
            let id = ev.interp.frames.register(frame);
            ev.interp.frames.mark_captured(id);
            Ok(Value::Object(Rc::new(ObjectValue { frame: id, proto: None })))
        }
    }
}
