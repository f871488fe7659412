//! The Viro value model.
//!
//! A value is a tagged variant: the tag identifies the semantic category and
//! fully determines the payload shape. Scalars are stored inline; composite
//! payloads (strings, binaries, blocks, parens, paths, functions, objects) are
//! reference counted, and blocks/parens additionally sit behind a `RefCell` so
//! set-path assignment can mutate them in place. Sharing a block therefore
//! never copies; reference identity is `Rc` pointer identity.

use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    fmt::Write as _,
    hash::{Hash, Hasher},
    rc::Rc,
};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::RunResult,
    eval::{Args, Evaluator, Refinements},
    frame::FrameId,
    intern::{Sym, SymbolTable},
    store::FrameStore,
};

/// Shared, in-place-mutable payload of a block or paren.
pub type BlockRef = Rc<RefCell<Vec<Value>>>;

/// Value tags. The tag uniquely determines the payload shape; a mismatch
/// between the two is an internal-error condition, not a user error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum Tag {
    #[strum(serialize = "none!")]
    None,
    #[strum(serialize = "logic!")]
    Logic,
    #[strum(serialize = "integer!")]
    Integer,
    #[strum(serialize = "decimal!")]
    Decimal,
    #[strum(serialize = "string!")]
    String,
    #[strum(serialize = "binary!")]
    Binary,
    #[strum(serialize = "block!")]
    Block,
    #[strum(serialize = "paren!")]
    Paren,
    #[strum(serialize = "word!")]
    Word,
    #[strum(serialize = "set-word!")]
    SetWord,
    #[strum(serialize = "get-word!")]
    GetWord,
    #[strum(serialize = "lit-word!")]
    LitWord,
    #[strum(serialize = "path!")]
    Path,
    #[strum(serialize = "function!")]
    Function,
    #[strum(serialize = "action!")]
    Action,
    #[strum(serialize = "object!")]
    Object,
    #[strum(serialize = "port!")]
    Port,
    #[strum(serialize = "datatype!")]
    Datatype,
}

/// A single function parameter specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Binding name inside the function's argument frame. For refinements the
    /// name is the bare spelling without the `--` prefix.
    pub name: Sym,
    /// Whether this is a `--name` refinement rather than a positional.
    pub refinement: bool,
    /// For refinements: whether the refinement consumes a value token.
    /// Value-carrying refinements default to `none`, flags to `false`.
    pub takes_value: bool,
    /// Whether the argument token is evaluated before binding. Lit-word
    /// parameters set this to false and receive the token literally.
    pub evaluate: bool,
}

impl Param {
    #[must_use]
    pub fn positional(name: Sym) -> Self {
        Self {
            name,
            refinement: false,
            takes_value: false,
            evaluate: true,
        }
    }

    #[must_use]
    pub fn literal(name: Sym) -> Self {
        Self {
            name,
            refinement: false,
            takes_value: false,
            evaluate: false,
        }
    }

    #[must_use]
    pub fn refinement(name: Sym, takes_value: bool) -> Self {
        Self {
            name,
            refinement: true,
            takes_value,
            evaluate: true,
        }
    }
}

/// Implementation of a native function.
///
/// Natives receive the collected positional arguments and the refinement map;
/// they raise bare errors with no location, annotation is applied by the
/// caller at the evaluation boundary.
pub type NativeImpl = fn(&mut Evaluator<'_>, Args, &Refinements) -> RunResult<Value>;

/// Body of a function value: user-defined block or native descriptor.
#[derive(Debug)]
pub enum FuncImpl {
    /// A user function: body block plus the frame captured at definition.
    /// `parent: None` means the root frame.
    User { body: BlockRef, parent: Option<FrameId> },
    /// A registered native implementation.
    Native(NativeImpl),
}

/// A function value: parameter specifications, body, captured parent frame,
/// display name, and the infix flag (first argument is the last value the
/// surrounding sequence produced).
#[derive(Debug)]
pub struct Function {
    /// Display name, adopted from the assigning set-word when still empty.
    /// Interior mutability keeps adoption visible through shared handles.
    pub name: RefCell<Option<Sym>>,
    pub params: Vec<Param>,
    pub infix: bool,
    pub imp: FuncImpl,
}

impl Function {
    /// Number of positional (non-refinement) parameters.
    #[must_use]
    pub fn positional_count(&self) -> usize {
        self.params.iter().filter(|p| !p.refinement).count()
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self.imp, FuncImpl::Native(_))
    }
}

/// A polymorphic native: the implementation is selected by the first
/// argument's tag through the type-frame registry.
#[derive(Debug)]
pub struct Action {
    pub name: Sym,
    /// Positional arity; every action argument is evaluated.
    pub arity: usize,
}

/// An object: owned frame plus an optional prototype to delegate field
/// lookups to.
#[derive(Debug)]
pub struct ObjectValue {
    pub frame: FrameId,
    pub proto: Option<Rc<ObjectValue>>,
}

/// Opaque I/O endpoint handle. The core never looks inside.
#[derive(Debug)]
pub struct PortHandle {
    pub scheme: Box<str>,
}

/// Primary runtime value.
///
/// Immutable from the language's perspective except for block and object
/// contents, which set-path assignment mutates in place.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Logic(bool),
    Int(i64),
    Decimal(f64),
    Str(Rc<str>),
    Binary(Rc<[u8]>),
    Block(BlockRef),
    Paren(BlockRef),
    Word(Sym),
    SetWord(Sym),
    GetWord(Sym),
    LitWord(Sym),
    /// Path segments in order. Tail segments are words or integers; the head
    /// may additionally be a block or paren literal (`[1 2 3].2`).
    Path(Rc<Vec<Value>>),
    Func(Rc<Function>),
    Action(Rc<Action>),
    Object(Rc<ObjectValue>),
    Port(Rc<PortHandle>),
    Datatype(Tag),
}

impl Value {
    #[must_use]
    pub fn tag(&self) -> Tag {
        match self {
            Self::None => Tag::None,
            Self::Logic(_) => Tag::Logic,
            Self::Int(_) => Tag::Integer,
            Self::Decimal(_) => Tag::Decimal,
            Self::Str(_) => Tag::String,
            Self::Binary(_) => Tag::Binary,
            Self::Block(_) => Tag::Block,
            Self::Paren(_) => Tag::Paren,
            Self::Word(_) => Tag::Word,
            Self::SetWord(_) => Tag::SetWord,
            Self::GetWord(_) => Tag::GetWord,
            Self::LitWord(_) => Tag::LitWord,
            Self::Path(_) => Tag::Path,
            Self::Func(_) => Tag::Function,
            Self::Action(_) => Tag::Action,
            Self::Object(_) => Tag::Object,
            Self::Port(_) => Tag::Port,
            Self::Datatype(_) => Tag::Datatype,
        }
    }

    /// Builds a string value.
    #[must_use]
    pub fn string(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    /// Builds a block value owning the given elements.
    #[must_use]
    pub fn block(items: Vec<Self>) -> Self {
        Self::Block(Rc::new(RefCell::new(items)))
    }

    /// Builds a paren value owning the given elements.
    #[must_use]
    pub fn paren(items: Vec<Self>) -> Self {
        Self::Paren(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_logic(&self) -> Option<bool> {
        match self {
            Self::Logic(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the shared payload of a block or paren.
    #[must_use]
    pub fn as_series(&self) -> Option<&BlockRef> {
        match self {
            Self::Block(b) | Self::Paren(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_block(&self) -> Option<&BlockRef> {
        match self {
            Self::Block(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_word(&self) -> Option<Sym> {
        match self {
            Self::Word(sym) => Some(*sym),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Self::Func(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Rc<ObjectValue>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Conditional truth: `none` and `false` are false, everything else true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::None | Self::Logic(false))
    }

    /// Tag-first equality.
    ///
    /// Numeric equality is exact; decimals compare by bit identity except that
    /// positive and negative zero are equal. Strings compare by bytes,
    /// case-sensitively. Blocks, parens, paths, functions, objects and ports
    /// compare by reference identity; there is no deep equality in the core.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Logic(a), Self::Logic(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => decimal_bits(*a) == decimal_bits(*b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Block(a), Self::Block(b)) | (Self::Paren(a), Self::Paren(b)) => Rc::ptr_eq(a, b),
            (Self::Word(a), Self::Word(b))
            | (Self::SetWord(a), Self::SetWord(b))
            | (Self::GetWord(a), Self::GetWord(b))
            | (Self::LitWord(a), Self::LitWord(b)) => a == b,
            (Self::Path(a), Self::Path(b)) => Rc::ptr_eq(a, b),
            (Self::Func(a), Self::Func(b)) => Rc::ptr_eq(a, b),
            (Self::Action(a), Self::Action(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Port(a), Self::Port(b)) => Rc::ptr_eq(a, b),
            (Self::Datatype(a), Self::Datatype(b)) => a == b,
            _ => false,
        }
    }

    /// Hash for values usable as map keys: integer, decimal, string, word,
    /// logic, none, datatype. Returns `None` for every other tag.
    #[must_use]
    pub fn key_hash(&self) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        self.tag().hash(&mut hasher);
        match self {
            Self::None => {}
            Self::Logic(b) => b.hash(&mut hasher),
            Self::Int(n) => n.hash(&mut hasher),
            Self::Decimal(d) => decimal_bits(*d).hash(&mut hasher),
            Self::Str(s) => s.as_bytes().hash(&mut hasher),
            Self::Word(sym) => sym.hash(&mut hasher),
            Self::Datatype(tag) => tag.hash(&mut hasher),
            _ => return None,
        }
        Some(hasher.finish())
    }

    /// Human form of the value. Strings appear without quotes, blocks without
    /// brackets. Used for REPL echo and error arguments; not part of the
    /// evaluation contract.
    #[must_use]
    pub fn form(&self, symbols: &SymbolTable, frames: &FrameStore) -> String {
        let mut out = String::new();
        self.write_form(&mut out, symbols, frames, false, 0);
        out
    }

    /// Source-like form of the value: strings quoted, blocks bracketed.
    #[must_use]
    pub fn mold(&self, symbols: &SymbolTable, frames: &FrameStore) -> String {
        let mut out = String::new();
        self.write_form(&mut out, symbols, frames, true, 0);
        out
    }

    fn write_form(&self, out: &mut String, symbols: &SymbolTable, frames: &FrameStore, molded: bool, depth: usize) {
        // Cyclic data (a block appended to itself) would otherwise recurse
        // forever; past the cap the remainder is elided.
        if depth > MAX_FORM_DEPTH {
            out.push_str("...");
            return;
        }
        match self {
            Self::None => out.push_str("none"),
            Self::Logic(true) => out.push_str("true"),
            Self::Logic(false) => out.push_str("false"),
            Self::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Self::Decimal(d) => {
                let mut buffer = ryu::Buffer::new();
                out.push_str(buffer.format(*d));
            }
            Self::Str(s) => {
                if molded {
                    write_string_literal(out, s);
                } else {
                    out.push_str(s);
                }
            }
            Self::Binary(bytes) => {
                out.push_str("#{");
                for byte in bytes.iter() {
                    let _ = write!(out, "{byte:02X}");
                }
                out.push('}');
            }
            Self::Block(items) => {
                if molded {
                    out.push('[');
                }
                write_elements(out, &items.borrow(), symbols, frames, molded, depth + 1);
                if molded {
                    out.push(']');
                }
            }
            Self::Paren(items) => {
                if molded {
                    out.push('(');
                }
                write_elements(out, &items.borrow(), symbols, frames, molded, depth + 1);
                if molded {
                    out.push(')');
                }
            }
            Self::Word(sym) => out.push_str(symbols.resolve(*sym)),
            Self::SetWord(sym) => {
                out.push_str(symbols.resolve(*sym));
                out.push(':');
            }
            Self::GetWord(sym) => {
                out.push(':');
                out.push_str(symbols.resolve(*sym));
            }
            Self::LitWord(sym) => {
                if molded {
                    out.push('\'');
                }
                out.push_str(symbols.resolve(*sym));
            }
            Self::Path(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        out.push('.');
                    }
                    segment.write_form(out, symbols, frames, true, depth + 1);
                }
            }
            Self::Func(f) => write_function(out, f, symbols, frames, depth),
            Self::Action(a) => {
                out.push_str("action ");
                out.push_str(symbols.resolve(a.name));
            }
            Self::Object(obj) => write_object(out, obj, symbols, frames, depth),
            Self::Port(port) => {
                out.push_str("port ");
                out.push_str(&port.scheme);
            }
            Self::Datatype(tag) => out.push_str(tag.into()),
        }
    }
}

/// Forming depth cap; cyclic structures are elided past this point.
const MAX_FORM_DEPTH: usize = 24;

fn write_elements(
    out: &mut String,
    items: &[Value],
    symbols: &SymbolTable,
    frames: &FrameStore,
    molded: bool,
    depth: usize,
) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        item.write_form(out, symbols, frames, molded, depth);
    }
}

fn write_function(out: &mut String, f: &Function, symbols: &SymbolTable, frames: &FrameStore, depth: usize) {
    match &f.imp {
        FuncImpl::Native(_) => {
            out.push_str("native");
            if let Some(name) = *f.name.borrow() {
                out.push(' ');
                out.push_str(symbols.resolve(name));
            }
        }
        FuncImpl::User { body, .. } => {
            out.push_str("func [");
            for (i, param) in f.params.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                if param.refinement {
                    out.push_str("--");
                } else if !param.evaluate {
                    out.push('\'');
                }
                out.push_str(symbols.resolve(param.name));
            }
            out.push_str("] [");
            write_elements(out, &body.borrow(), symbols, frames, true, depth + 1);
            out.push(']');
        }
    }
}

fn write_object(out: &mut String, obj: &ObjectValue, symbols: &SymbolTable, frames: &FrameStore, depth: usize) {
    out.push_str("make object! [");
    let frame = frames.get(obj.frame);
    for (i, (sym, value)) in frame.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(symbols.resolve(*sym));
        out.push_str(": ");
        value.write_form(out, symbols, frames, true, depth + 1);
    }
    out.push(']');
}

/// Writes a double-quoted string literal with caret escapes.
fn write_string_literal(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("^\""),
            '^' => out.push_str("^^"),
            '\n' => out.push_str("^/"),
            '\t' => out.push_str("^-"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// Decimal bits with negative zero normalized, so `0.0` and `-0.0` compare
/// and hash identically.
fn decimal_bits(d: f64) -> u64 {
    if d == 0.0 { 0.0f64.to_bits() } else { d.to_bits() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_decimals_compare_equal() {
        assert!(Value::Decimal(0.0).equals(&Value::Decimal(-0.0)));
        assert!(!Value::Decimal(1.0).equals(&Value::Decimal(2.0)));
    }

    #[test]
    fn nan_is_bit_identical_to_itself() {
        assert!(Value::Decimal(f64::NAN).equals(&Value::Decimal(f64::NAN)));
    }

    #[test]
    fn cross_tag_numbers_are_not_equal() {
        assert!(!Value::Int(1).equals(&Value::Decimal(1.0)));
    }

    #[test]
    fn block_equality_is_reference_identity() {
        let a = Value::block(vec![Value::Int(1)]);
        let b = a.clone();
        let c = Value::block(vec![Value::Int(1)]);
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }

    #[test]
    fn key_hash_covers_only_key_tags() {
        assert!(Value::Int(7).key_hash().is_some());
        assert!(Value::string("x").key_hash().is_some());
        assert!(Value::None.key_hash().is_some());
        assert!(Value::block(vec![]).key_hash().is_none());
    }

    #[test]
    fn equal_zeros_hash_identically() {
        assert_eq!(Value::Decimal(0.0).key_hash(), Value::Decimal(-0.0).key_hash());
    }
}
