//! Arithmetic, comparison, and logic natives.
//!
//! Each operation exists twice: as a prefix word (`add`, `lesser?`) and as an
//! infix operator (`+`, `<`). Both share one implementation; the infix form
//! differs only in its call convention. Integer arithmetic is checked;
//! mixed integer/decimal operands promote to decimal.

use crate::{
    error::{Error, RunResult},
    eval::{Args, Evaluator, Interp, Refinements},
    natives::{arg, register},
    value::Value,
};

pub(crate) fn install(interp: &mut Interp) {
    let two = &[arg("value1"), arg("value2")];

    register(interp, "add", two, false, add);
    register(interp, "subtract", two, false, subtract);
    register(interp, "multiply", two, false, multiply);
    register(interp, "divide", two, false, divide);
    register(interp, "modulo", two, false, modulo);
    register(interp, "+", two, true, add);
    register(interp, "-", two, true, subtract);
    register(interp, "*", two, true, multiply);
    register(interp, "/", two, true, divide);

    register(interp, "equal?", two, false, equal);
    register(interp, "not-equal?", two, false, not_equal);
    register(interp, "lesser?", two, false, lesser);
    register(interp, "greater?", two, false, greater);
    register(interp, "=", two, true, equal);
    register(interp, "<>", two, true, not_equal);
    register(interp, "<", two, true, lesser);
    register(interp, ">", two, true, greater);
    register(interp, "<=", two, true, lesser_or_equal);
    register(interp, ">=", two, true, greater_or_equal);

    register(interp, "and", two, true, and);
    register(interp, "or", two, true, or);
    register(interp, "not", &[arg("value")], false, not);

    let one = &[arg("value")];
    register(interp, "negate", one, false, negate);
    register(interp, "absolute", one, false, absolute);
    register(interp, "min", two, false, min);
    register(interp, "max", two, false, max);
    register(interp, "zero?", one, false, zero);
    register(interp, "even?", one, false, even);
    register(interp, "odd?", one, false, odd);
}

/// Numeric operand pair with int/decimal promotion applied.
enum Operands {
    Ints(i64, i64),
    Decimals(f64, f64),
}

fn numeric_operands(name: &str, a: &Value, b: &Value) -> RunResult<Operands> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(Operands::Ints(*a, *b)),
        (Value::Decimal(a), Value::Decimal(b)) => Ok(Operands::Decimals(*a, *b)),
        (Value::Int(a), Value::Decimal(b)) => Ok(Operands::Decimals(*a as f64, *b)),
        (Value::Decimal(a), Value::Int(b)) => Ok(Operands::Decimals(*a, *b as f64)),
        _ => Err(Error::invalid_operation(format!(
            "{name} expects integer! or decimal! values"
        ))),
    }
}

fn arith(
    args: Args,
    name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    dec_op: fn(f64, f64) -> f64,
) -> RunResult<Value> {
    let (a, b) = args.into_two(name)?;
    match numeric_operands(name, &a, &b)? {
        Operands::Ints(a, b) => int_op(a, b).map(Value::Int).ok_or_else(Error::math_overflow),
        Operands::Decimals(a, b) => Ok(Value::Decimal(dec_op(a, b))),
    }
}

fn add(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    arith(args, "add", i64::checked_add, |a, b| a + b)
}

fn subtract(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    arith(args, "subtract", i64::checked_sub, |a, b| a - b)
}

fn multiply(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    arith(args, "multiply", i64::checked_mul, |a, b| a * b)
}

/// Integer division produces an integer when exact, a decimal otherwise.
fn divide(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("divide")?;
    match numeric_operands("divide", &a, &b)? {
        Operands::Ints(a, b) => {
            if b == 0 {
                Err(Error::div_by_zero())
            } else if a.checked_rem(b) == Some(0) {
                a.checked_div(b).map(Value::Int).ok_or_else(Error::math_overflow)
            } else {
                Ok(Value::Decimal(a as f64 / b as f64))
            }
        }
        Operands::Decimals(a, b) => {
            if b == 0.0 {
                Err(Error::div_by_zero())
            } else {
                Ok(Value::Decimal(a / b))
            }
        }
    }
}

fn modulo(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("modulo")?;
    match numeric_operands("modulo", &a, &b)? {
        Operands::Ints(a, b) => {
            if b == 0 {
                Err(Error::div_by_zero())
            } else {
                a.checked_rem(b).map(Value::Int).ok_or_else(Error::math_overflow)
            }
        }
        Operands::Decimals(a, b) => {
            if b == 0.0 {
                Err(Error::div_by_zero())
            } else {
                Ok(Value::Decimal(a % b))
            }
        }
    }
}

fn equal(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("equal?")?;
    Ok(Value::Logic(a.equals(&b)))
}

fn not_equal(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("not-equal?")?;
    Ok(Value::Logic(!a.equals(&b)))
}

fn compare(args: Args, name: &str, int_cmp: fn(i64, i64) -> bool, dec_cmp: fn(f64, f64) -> bool) -> RunResult<Value> {
    let (a, b) = args.into_two(name)?;
    // Strings compare lexicographically, numbers numerically.
    if let (Value::Str(a), Value::Str(b)) = (&a, &b) {
        let ordering = a.as_bytes().cmp(b.as_bytes());
        let as_ints = (i64::from(ordering as i8), 0);
        return Ok(Value::Logic(int_cmp(as_ints.0, as_ints.1)));
    }
    match numeric_operands(name, &a, &b)? {
        Operands::Ints(a, b) => Ok(Value::Logic(int_cmp(a, b))),
        Operands::Decimals(a, b) => Ok(Value::Logic(dec_cmp(a, b))),
    }
}

fn lesser(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    compare(args, "lesser?", |a, b| a < b, |a, b| a < b)
}

fn greater(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    compare(args, "greater?", |a, b| a > b, |a, b| a > b)
}

fn lesser_or_equal(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    compare(args, "<=", |a, b| a <= b, |a, b| a <= b)
}

fn greater_or_equal(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    compare(args, ">=", |a, b| a >= b, |a, b| a >= b)
}

fn and(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("and")?;
    Ok(Value::Logic(a.is_truthy() && b.is_truthy()))
}

fn or(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("or")?;
    Ok(Value::Logic(a.is_truthy() || b.is_truthy()))
}

fn not(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let value = args.into_one("not")?;
    Ok(Value::Logic(!value.is_truthy()))
}

fn negate(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    match args.into_one("negate")? {
        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(Error::math_overflow),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        _ => Err(Error::invalid_operation("negate expects integer! or decimal!")),
    }
}

fn absolute(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    match args.into_one("absolute")? {
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(Error::math_overflow),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        _ => Err(Error::invalid_operation("absolute expects integer! or decimal!")),
    }
}

fn min(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("min")?;
    let first = match numeric_operands("min", &a, &b)? {
        Operands::Ints(x, y) => x <= y,
        Operands::Decimals(x, y) => x <= y,
    };
    Ok(if first { a } else { b })
}

fn max(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let (a, b) = args.into_two("max")?;
    let first = match numeric_operands("max", &a, &b)? {
        Operands::Ints(x, y) => x >= y,
        Operands::Decimals(x, y) => x >= y,
    };
    Ok(if first { a } else { b })
}

fn zero(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    let result = match args.into_one("zero?")? {
        Value::Int(n) => n == 0,
        Value::Decimal(d) => d == 0.0,
        _ => false,
    };
    Ok(Value::Logic(result))
}

fn even(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    match args.into_one("even?")? {
        Value::Int(n) => Ok(Value::Logic(n % 2 == 0)),
        _ => Err(Error::invalid_operation("even? expects an integer!")),
    }
}

fn odd(_ev: &mut Evaluator<'_>, args: Args, _refs: &Refinements) -> RunResult<Value> {
    match args.into_one("odd?")? {
        Value::Int(n) => Ok(Value::Logic(n % 2 != 0)),
        _ => Err(Error::invalid_operation("odd? expects an integer!")),
    }
}
