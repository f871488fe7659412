//! Series actions: `first`, `last`, `length?`, `pick`, and `append`.
//!
//! These are registered as actions, so the call word resolves to a dispatch
//! name and the implementation is selected by the first argument's tag
//! through the type-frame registry. Blocks and parens share one set of
//! implementations; strings have their own rune-based ones. Strings carry no
//! `append` (they are immutable), which makes `append "x" "y"` a
//! `script/action-no-impl` error by construction.

use crate::{
    error::{Error, RunResult},
    eval::{Args, Evaluator, Interp, Refinements},
    natives::{arg, native_fn, register_action, register_type_frame},
    value::{Tag, Value},
};

pub(crate) fn install(interp: &mut Interp) {
    let first = register_action(interp, "first", 1);
    let last = register_action(interp, "last", 1);
    let length = register_action(interp, "length?", 1);
    let empty = register_action(interp, "empty?", 1);
    let pick = register_action(interp, "pick", 2);
    let append = register_action(interp, "append", 2);
    let insert = register_action(interp, "insert", 2);
    let copy = register_action(interp, "copy", 1);

    let one = &[arg("series")];
    let two = &[arg("series"), arg("index")];
    let with_value = &[arg("series"), arg("value")];

    for tag in [Tag::Block, Tag::Paren] {
        let implementations = vec![
            (first, native_fn(interp, "first", one, false, block_first)),
            (last, native_fn(interp, "last", one, false, block_last)),
            (length, native_fn(interp, "length?", one, false, block_length)),
            (empty, native_fn(interp, "empty?", one, false, block_empty)),
            (pick, native_fn(interp, "pick", two, false, block_pick)),
            (append, native_fn(interp, "append", with_value, false, block_append)),
            (insert, native_fn(interp, "insert", with_value, false, block_insert)),
            (copy, native_fn(interp, "copy", one, false, block_copy)),
        ];
        register_type_frame(interp, tag, implementations);
    }

    let implementations = vec![
        (first, native_fn(interp, "first", one, false, string_first)),
        (last, native_fn(interp, "last", one, false, string_last)),
        (length, native_fn(interp, "length?", one, false, string_length)),
        (empty, native_fn(interp, "empty?", one, false, string_empty)),
        (pick, native_fn(interp, "pick", two, false, string_pick)),
        (copy, native_fn(interp, "copy", one, false, string_copy)),
    ];
    register_type_frame(interp, Tag::String, implementations);
}

fn series_elements(name: &str, value: &Value) -> RunResult<Vec<Value>> {
    value
        .as_series()
        .map(|series| series.borrow().clone())
        .ok_or_else(|| Error::invalid_operation(format!("{name} expects a series")))
}

fn block_first(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("first")?;
    let elements = series_elements("first", &series)?;
    elements.first().cloned().ok_or_else(|| Error::index_out_of_range(1, 0))
}

fn block_last(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("last")?;
    let elements = series_elements("last", &series)?;
    elements.last().cloned().ok_or_else(|| Error::index_out_of_range(1, 0))
}

fn block_length(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("length?")?;
    let elements = series_elements("length?", &series)?;
    Ok(Value::Int(i64::try_from(elements.len()).unwrap_or(i64::MAX)))
}

/// 1-based pick; out-of-range picks produce `none` rather than an error.
fn block_pick(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (series, index) = args.into_two("pick")?;
    let elements = series_elements("pick", &series)?;
    let Some(index) = index.as_int() else {
        return Err(Error::invalid_operation("pick expects an integer! index"));
    };
    let picked = usize::try_from(index)
        .ok()
        .filter(|n| (1..=elements.len()).contains(n))
        .map(|n| elements[n - 1].clone());
    Ok(picked.unwrap_or(Value::None))
}

/// Appends in place and returns the same series.
fn block_append(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (series, value) = args.into_two("append")?;
    {
        let Some(elements) = series.as_series() else {
            return Err(Error::invalid_operation("append expects a series"));
        };
        elements.borrow_mut().push(value);
    }
    Ok(series)
}

fn block_empty(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("empty?")?;
    let elements = series_elements("empty?", &series)?;
    Ok(Value::Logic(elements.is_empty()))
}

/// Inserts in place at the head and returns the same series.
fn block_insert(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (series, value) = args.into_two("insert")?;
    {
        let Some(elements) = series.as_series() else {
            return Err(Error::invalid_operation("insert expects a series"));
        };
        elements.borrow_mut().insert(0, value);
    }
    Ok(series)
}

/// Shallow copy: a fresh series whose elements share the originals.
fn block_copy(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("copy")?;
    let elements = series_elements("copy", &series)?;
    Ok(match series {
        Value::Paren(_) => Value::paren(elements),
        _ => Value::block(elements),
    })
}

fn string_runes(name: &str, value: &Value) -> RunResult<Vec<char>> {
    value
        .as_str()
        .map(|s| s.chars().collect())
        .ok_or_else(|| Error::invalid_operation(format!("{name} expects a string!")))
}

fn rune_value(rune: char) -> Value {
    Value::string(rune.encode_utf8(&mut [0u8; 4]))
}

fn string_first(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("first")?;
    let runes = string_runes("first", &series)?;
    runes.first().copied().map(rune_value).ok_or_else(|| Error::index_out_of_range(1, 0))
}

fn string_last(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("last")?;
    let runes = string_runes("last", &series)?;
    runes.last().copied().map(rune_value).ok_or_else(|| Error::index_out_of_range(1, 0))
}

fn string_length(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("length?")?;
    let runes = string_runes("length?", &series)?;
    Ok(Value::Int(i64::try_from(runes.len()).unwrap_or(i64::MAX)))
}

fn string_empty(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("empty?")?;
    let runes = string_runes("empty?", &series)?;
    Ok(Value::Logic(runes.is_empty()))
}

fn string_copy(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let series = args.into_one("copy")?;
    let Some(s) = series.as_str() else {
        return Err(Error::invalid_operation("copy expects a string!"));
    };
    Ok(Value::string(s))
}

fn string_pick(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (series, index) = args.into_two("pick")?;
    let runes = string_runes("pick", &series)?;
    let Some(index) = index.as_int() else {
        return Err(Error::invalid_operation("pick expects an integer! index"));
    };
    let picked = usize::try_from(index)
        .ok()
        .filter(|n| (1..=runes.len()).contains(n))
        .map(|n| rune_value(runes[n - 1]));
    Ok(picked.unwrap_or(Value::None))
}
