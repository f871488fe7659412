//! Core natives: construction (`make`, `func`), output (`print`, `prin`,
//! `probe`), reflection (`form`, `mold`, `type?`), and binding access
//! (`get`, `set`, `reduce`, `quote`).

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{Error, RunResult},
    eval::{Args, Evaluator, Interp, Refinements},
    frame::ROOT_FRAME,
    natives::{arg, flag, lit, register},
    value::{FuncImpl, Function, Param, Tag, Value},
};

pub(crate) fn install(interp: &mut Interp) {
    register(interp, "make", &[arg("type"), arg("spec")], false, make);
    register(interp, "func", &[arg("spec"), arg("body"), flag("infix")], false, func);
    register(interp, "print", &[arg("value")], false, print);
    register(interp, "prin", &[arg("value")], false, prin);
    register(interp, "probe", &[arg("value")], false, probe);
    register(interp, "form", &[arg("value")], false, form);
    register(interp, "mold", &[arg("value")], false, mold);
    register(interp, "type?", &[arg("value")], false, type_of);
    register(interp, "get", &[arg("word")], false, get);
    register(interp, "set", &[arg("word"), arg("value")], false, set);
    register(interp, "reduce", &[arg("block")], false, reduce);
    register(interp, "quote", &[lit("value")], false, quote);

    let one = &[arg("value")];
    register(interp, "none?", one, false, is_none);
    register(interp, "logic?", one, false, is_logic);
    register(interp, "integer?", one, false, is_integer);
    register(interp, "decimal?", one, false, is_decimal);
    register(interp, "string?", one, false, is_string);
    register(interp, "block?", one, false, is_block);
    register(interp, "word?", one, false, is_word);
    register(interp, "object?", one, false, is_object);
    register(interp, "function?", one, false, is_function);
    register(interp, "value?", one, false, is_bound);
    register(interp, "to-string", one, false, to_string);
    register(interp, "to-integer", one, false, to_integer);
}

/// `make object! [...]` constructs an object; `make <object> [...]` derives
/// from a prototype; `make block! <count>` pre-allocates a block.
fn make(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (target, spec) = args.into_two("make")?;
    match (&target, &spec) {
        (Value::Datatype(Tag::Object), Value::Block(body)) => {
            let items = body.borrow().clone();
            ev.construct_object(&items, None)
        }
        (Value::Object(proto), Value::Block(body)) => {
            let items = body.borrow().clone();
            ev.construct_object(&items, Some(proto))
        }
        (Value::Datatype(Tag::Block), Value::Int(capacity)) => {
            let capacity = usize::try_from(*capacity).unwrap_or(0);
            Ok(Value::Block(Rc::new(RefCell::new(Vec::with_capacity(capacity)))))
        }
        (Value::Datatype(Tag::Block), Value::Block(source)) => Ok(Value::block(source.borrow().clone())),
        _ => Err(Error::invalid_operation(format!(
            "cannot make {} from {}",
            <&str>::from(target.tag()),
            <&str>::from(spec.tag())
        ))),
    }
}

/// Builds a user function from a spec block and a body block.
///
/// Spec block grammar: plain words are evaluated positionals, lit-words are
/// literal (unevaluated) positionals, `--name` words declare refinements. A
/// plain word directly after a refinement marks that refinement as
/// value-carrying; the value binds under the refinement's own name. Strings
/// in the spec are documentation and are skipped. The `--infix` refinement on
/// `func` itself makes the first parameter consume the preceding value.
fn func(ev: &mut Evaluator<'_>, args: Args, refs: &Refinements) -> RunResult<Value> {
    let (spec, body) = args.into_two("func")?;
    let Some(spec) = spec.as_block() else {
        return Err(Error::invalid_operation("func expects a block! spec"));
    };
    let Some(body) = body.as_block() else {
        return Err(Error::invalid_operation("func expects a block! body"));
    };

    let mut params: Vec<Param> = Vec::new();
    let mut pending_refinement: Option<usize> = None;
    for item in spec.borrow().iter() {
        match item {
            Value::Word(sym) => {
                let spelling = ev.interp.symbols.resolve(*sym).to_owned();
                if let Some(bare) = spelling.strip_prefix("--") {
                    let bare_sym = ev.interp.symbols.intern(bare);
                    params.push(Param::refinement(bare_sym, false));
                    pending_refinement = Some(params.len() - 1);
                } else if let Some(index) = pending_refinement {
                    if params[index].takes_value {
                        return Err(Error::invalid_operation(format!(
                            "unexpected word {spelling} in function spec"
                        )));
                    }
                    params[index].takes_value = true;
                } else {
                    params.push(Param::positional(*sym));
                }
            }
            Value::LitWord(sym) => {
                if pending_refinement.is_some() {
                    return Err(Error::invalid_operation("literal parameters must precede refinements"));
                }
                params.push(Param::literal(*sym));
            }
            // Doc strings are allowed anywhere in the spec.
            Value::Str(_) => {}
            other => {
                return Err(Error::invalid_operation(format!(
                    "invalid function spec entry of type {}",
                    <&str>::from(other.tag())
                )));
            }
        }
    }

    let infix_sym = ev.interp.symbols.intern("infix");
    let top = ev.interp.frames.top();
    let parent = (top != ROOT_FRAME).then_some(top);
    if let Some(parent) = parent {
        ev.interp.frames.mark_captured(parent);
    }

    Ok(Value::Func(Rc::new(Function {
        name: RefCell::new(None),
        params,
        infix: refs.is_on(infix_sym),
        imp: FuncImpl::User {
            body: Rc::clone(body),
            parent,
        },
    })))
}

/// Forms a value for printing. Blocks are reduced first, their results formed
/// and joined with spaces.
fn printable(ev: &mut Evaluator<'_>, value: &Value) -> RunResult<String> {
    if let Value::Block(items) = value {
        let items = items.borrow().clone();
        let reduced = ev.reduce_items(&items)?;
        let formed: Vec<String> = reduced.iter().map(|v| ev.form(v)).collect();
        Ok(formed.join(" "))
    } else {
        Ok(ev.form(value))
    }
}

fn print(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("print")?;
    let text = printable(ev, &value)?;
    ev.emit(&text);
    ev.emit_char('\n');
    Ok(Value::None)
}

fn prin(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("prin")?;
    let text = printable(ev, &value)?;
    ev.emit(&text);
    Ok(Value::None)
}

/// Prints the molded value and returns it, for inline inspection.
fn probe(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("probe")?;
    let text = ev.mold(&value);
    ev.emit(&text);
    ev.emit_char('\n');
    Ok(value)
}

fn form(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("form")?;
    Ok(Value::string(&ev.form(&value)))
}

fn mold(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("mold")?;
    Ok(Value::string(&ev.mold(&value)))
}

fn type_of(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("type?")?;
    Ok(Value::Datatype(value.tag()))
}

/// `get 'word` looks the word up in the active chain without evaluating the
/// result.
fn get(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("get")?;
    let Some(sym) = value.as_word() else {
        return Err(Error::invalid_operation("get expects a word!"));
    };
    ev.lookup(sym)
        .ok_or_else(|| Error::no_value(ev.interp.symbols.resolve(sym)))
}

/// `set 'word value` binds the word in the innermost active frame.
fn set(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (word, value) = args.into_two("set")?;
    let Some(sym) = word.as_word() else {
        return Err(Error::invalid_operation("set expects a word!"));
    };
    ev.interp.frames.bind_top(sym, value.clone());
    Ok(value)
}

/// Evaluates each expression in a block and returns a new block of the
/// results.
fn reduce(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("reduce")?;
    let Some(items) = value.as_block() else {
        return Err(Error::invalid_operation("reduce expects a block!"));
    };
    let items = items.borrow().clone();
    Ok(Value::block(ev.reduce_items(&items)?))
}

/// Returns its argument token without evaluating it.
fn quote(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    args.into_one("quote")
}

fn predicate(args: Args, name: &str, tag: Tag) -> RunResult<Value> {
    Ok(Value::Logic(args.into_one(name)?.tag() == tag))
}

fn is_none(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "none?", Tag::None)
}

fn is_logic(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "logic?", Tag::Logic)
}

fn is_integer(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "integer?", Tag::Integer)
}

fn is_decimal(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "decimal?", Tag::Decimal)
}

fn is_string(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "string?", Tag::String)
}

fn is_block(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "block?", Tag::Block)
}

fn is_word(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "word?", Tag::Word)
}

fn is_object(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "object?", Tag::Object)
}

fn is_function(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    predicate(args, "function?", Tag::Function)
}

/// `value? 'word` tests whether a word has a binding in the active chain.
fn is_bound(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("value?")?;
    let Some(sym) = value.as_word() else {
        return Err(Error::invalid_operation("value? expects a word!"));
    };
    Ok(Value::Logic(ev.lookup(sym).is_some()))
}

/// Converts any value to its human form as a string.
fn to_string(ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("to-string")?;
    Ok(Value::string(&ev.form(&value)))
}

/// Converts strings, decimals, and logic values to integers. Decimals
/// truncate toward zero.
fn to_integer(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    match args.into_one("to-integer")? {
        Value::Int(n) => Ok(Value::Int(n)),
        Value::Decimal(d) if d.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(&d) => {
            Ok(Value::Int(d.trunc() as i64))
        }
        Value::Decimal(_) => Err(Error::math_overflow()),
        Value::Logic(b) => Ok(Value::Int(i64::from(b))),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::invalid_operation(format!("cannot convert \"{s}\" to integer!"))),
        other => Err(Error::invalid_operation(format!(
            "cannot convert {} to integer!",
            <&str>::from(other.tag())
        ))),
    }
}
