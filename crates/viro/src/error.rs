//! Error kinds, stable identifiers, and the annotation machinery.
//!
//! Errors are values: they propagate up the evaluation stack as the `Err`
//! side of [`RunResult`] without any exceptional unwind. The engine annotates
//! an error with a "near" snapshot the first time it catches it at a known
//! token index, and with a "where" call chain the first time it crosses a
//! function-call boundary; once populated neither is overwritten. Early
//! function exit is the distinguished [`Raise::Return`] signal, caught at the
//! function boundary and never user-visible.

use serde::Serialize;
use smallvec::SmallVec;
use strum::{Display, EnumString, IntoStaticStr};

use crate::value::Value;

/// Result type for everything the evaluator does.
pub type RunResult<T> = Result<T, Raise>;

/// The six error kinds. Kinds drive exit categorization and the user-visible
/// prefix; ids drive message templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Syntax,
    Script,
    Math,
    Access,
    Internal,
    User,
}

/// Stable error identifiers, shared across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ErrorId {
    NoValue,
    ArgCount,
    NonePath,
    IndexOutOfRange,
    PathTypeMismatch,
    NoSuchField,
    ImmutableTarget,
    InvalidPath,
    InvalidOperation,
    SandboxViolation,
    DivByZero,
    ActionNoImpl,
    StackOverflow,
    UnexpectedEof,
    UnclosedBlock,
    UnclosedParen,
    UnclosedString,
    InvalidSyntax,
    Interrupt,
}

/// A structured Viro error: kind, stable id, up to three argument strings for
/// message interpolation, and the populate-once "near"/"where" context.
#[derive(Debug, Clone, Serialize)]
pub struct Error {
    pub kind: ErrorKind,
    pub id: ErrorId,
    pub args: SmallVec<[String; 3]>,
    /// Textual snapshot of the tokens around the failure, caret on the
    /// failing one.
    pub near: Option<String>,
    /// Call-stack display names, outermost first.
    #[serde(rename = "where")]
    pub where_: Vec<String>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, id: ErrorId) -> Self {
        Self {
            kind,
            id,
            args: SmallVec::new(),
            near: None,
            where_: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Boxes the error into the raise signal.
    #[must_use]
    pub fn raise(self) -> Raise {
        Raise::Error(Box::new(self))
    }

    pub fn set_near_if_empty(&mut self, near: impl Into<String>) {
        if self.near.is_none() {
            self.near = Some(near.into());
        }
    }

    pub fn set_where_if_empty(&mut self, where_: &[String]) {
        if self.where_.is_empty() {
            self.where_ = where_.to_vec();
        }
    }

    /// Renders the message template for this id with the argument strings.
    #[must_use]
    pub fn message(&self) -> String {
        let a = |i: usize| self.args.get(i).map_or("?", String::as_str);
        match self.id {
            ErrorId::NoValue => format!("{} has no value", a(0)),
            ErrorId::ArgCount => format!("{} is missing arguments (expected {}, got {})", a(0), a(1), a(2)),
            ErrorId::NonePath => "cannot follow a path through none".to_owned(),
            ErrorId::IndexOutOfRange => format!("index {} is out of range for a series of length {}", a(0), a(1)),
            ErrorId::PathTypeMismatch => format!("cannot select {} out of a {} value", a(0), a(1)),
            ErrorId::NoSuchField => format!("object has no field named {}", a(0)),
            ErrorId::ImmutableTarget => "cannot modify a literal value".to_owned(),
            ErrorId::InvalidPath => format!("invalid path expression {}", a(0)),
            ErrorId::InvalidOperation => format!("invalid operation: {}", a(0)),
            ErrorId::SandboxViolation => format!("sandbox violation: {}", a(0)),
            ErrorId::DivByZero => "attempt to divide by zero".to_owned(),
            ErrorId::ActionNoImpl => format!("action {} has no implementation for {}", a(0), a(1)),
            ErrorId::StackOverflow => format!("evaluation exceeded the recursion limit of {}", a(0)),
            ErrorId::UnexpectedEof => "unexpected end of input".to_owned(),
            ErrorId::UnclosedBlock => "unclosed block (missing ])".to_owned(),
            ErrorId::UnclosedParen => "unclosed paren (missing ))".to_owned(),
            ErrorId::UnclosedString => "unclosed string literal".to_owned(),
            ErrorId::InvalidSyntax => format!("invalid syntax: {}", a(0)),
            ErrorId::Interrupt => "evaluation interrupted".to_owned(),
        }
    }

    /// Exit category used by drivers to map the error to a process exit code.
    #[must_use]
    pub fn exit_category(&self) -> ExitCategory {
        if self.id == ErrorId::Interrupt {
            return ExitCategory::Interrupt;
        }
        match self.kind {
            ErrorKind::Script | ErrorKind::Math | ErrorKind::User => ExitCategory::Script,
            ErrorKind::Syntax => ExitCategory::Syntax,
            ErrorKind::Access => ExitCategory::Access,
            ErrorKind::Internal => ExitCategory::Internal,
        }
    }

    /// Machine-readable record carrying the same fields as the human line.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind,
            "id": self.id,
            "message": self.message(),
            "args": self.args.as_slice(),
            "near": self.near,
            "where": self.where_,
        })
    }

    // -- script errors --------------------------------------------------

    #[must_use]
    pub fn no_value(name: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::NoValue).arg(name).raise()
    }

    #[must_use]
    pub fn arg_count(name: impl Into<String>, expected: usize, got: usize) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::ArgCount)
            .arg(name)
            .arg(expected.to_string())
            .arg(got.to_string())
            .raise()
    }

    #[must_use]
    pub fn none_path() -> Raise {
        Self::new(ErrorKind::Script, ErrorId::NonePath).raise()
    }

    #[must_use]
    pub fn index_out_of_range(index: i64, len: usize) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::IndexOutOfRange)
            .arg(index.to_string())
            .arg(len.to_string())
            .raise()
    }

    #[must_use]
    pub fn path_type_mismatch(segment: impl Into<String>, tag: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::PathTypeMismatch)
            .arg(segment)
            .arg(tag)
            .raise()
    }

    #[must_use]
    pub fn no_such_field(field: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::NoSuchField).arg(field).raise()
    }

    #[must_use]
    pub fn immutable_target() -> Raise {
        Self::new(ErrorKind::Script, ErrorId::ImmutableTarget).raise()
    }

    #[must_use]
    pub fn invalid_path(text: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::InvalidPath).arg(text).raise()
    }

    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::InvalidOperation).arg(message).raise()
    }

    #[must_use]
    pub fn action_no_impl(action: impl Into<String>, type_name: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Script, ErrorId::ActionNoImpl)
            .arg(action)
            .arg(type_name)
            .raise()
    }

    // -- math / access / internal ---------------------------------------

    #[must_use]
    pub fn div_by_zero() -> Raise {
        Self::new(ErrorKind::Math, ErrorId::DivByZero).raise()
    }

    #[must_use]
    pub fn math_overflow() -> Raise {
        Self::new(ErrorKind::Math, ErrorId::InvalidOperation)
            .arg("integer overflow")
            .raise()
    }

    #[must_use]
    pub fn sandbox_violation(what: impl Into<String>) -> Raise {
        Self::new(ErrorKind::Access, ErrorId::SandboxViolation).arg(what).raise()
    }

    #[must_use]
    pub fn stack_overflow(limit: usize) -> Raise {
        Self::new(ErrorKind::Internal, ErrorId::StackOverflow)
            .arg(limit.to_string())
            .raise()
    }

    #[must_use]
    pub fn interrupt() -> Raise {
        Self::new(ErrorKind::Internal, ErrorId::Interrupt).raise()
    }

    // -- syntax errors (raised by the parser, not the engine) ------------

    #[must_use]
    pub fn unexpected_eof() -> Self {
        Self::new(ErrorKind::Syntax, ErrorId::UnexpectedEof)
    }

    #[must_use]
    pub fn unclosed_block() -> Self {
        Self::new(ErrorKind::Syntax, ErrorId::UnclosedBlock)
    }

    #[must_use]
    pub fn unclosed_paren() -> Self {
        Self::new(ErrorKind::Syntax, ErrorId::UnclosedParen)
    }

    #[must_use]
    pub fn unclosed_string() -> Self {
        Self::new(ErrorKind::Syntax, ErrorId::UnclosedString)
    }

    #[must_use]
    pub fn invalid_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, ErrorId::InvalidSyntax).arg(message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Error: {}", self.kind, self.message())?;
        if let Some(near) = &self.near {
            write!(f, "\nnear: {near}")?;
        }
        if !self.where_.is_empty() {
            write!(f, "\nwhere: {}", self.where_.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Non-local signal travelling up the evaluation stack.
#[derive(Debug)]
pub enum Raise {
    /// A real error, boxed to keep the `Err` side of [`RunResult`] one word.
    Error(Box<Error>),
    /// Early function exit carrying the return value. Converted to a normal
    /// result at the function-call boundary.
    Return(Value),
}

impl From<Error> for Raise {
    fn from(error: Error) -> Self {
        Self::Error(Box::new(error))
    }
}

/// Process exit categories. The engine maps error kind to category; the
/// driver maps category to exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCategory {
    Success,
    Script,
    Syntax,
    Access,
    Usage,
    Internal,
    Interrupt,
}

impl ExitCategory {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Script => 1,
            Self::Syntax => 2,
            Self::Access => 3,
            Self::Usage => 64,
            Self::Internal => 70,
            Self::Interrupt => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_near_and_where_once_set() {
        let mut error = Error::new(ErrorKind::Script, ErrorId::NoValue).arg("x");
        error.set_near_if_empty("x + 1");
        error.set_where_if_empty(&["outer".to_owned(), "inner".to_owned()]);
        let text = error.to_string();
        assert_eq!(text, "Script Error: x has no value\nnear: x + 1\nwhere: outer inner");
    }

    #[test]
    fn near_and_where_are_populate_once() {
        let mut error = Error::new(ErrorKind::Script, ErrorId::NonePath);
        error.set_near_if_empty("first");
        error.set_near_if_empty("second");
        assert_eq!(error.near.as_deref(), Some("first"));

        error.set_where_if_empty(&["a".to_owned()]);
        error.set_where_if_empty(&["b".to_owned()]);
        assert_eq!(error.where_, vec!["a".to_owned()]);
    }

    #[test]
    fn exit_categories_follow_kind_and_interrupt_id() {
        assert_eq!(
            Error::new(ErrorKind::Math, ErrorId::DivByZero).exit_category().code(),
            1
        );
        assert_eq!(Error::unexpected_eof().exit_category().code(), 2);
        assert_eq!(
            Error::new(ErrorKind::Access, ErrorId::SandboxViolation)
                .exit_category()
                .code(),
            3
        );
        assert_eq!(
            Error::new(ErrorKind::Internal, ErrorId::StackOverflow)
                .exit_category()
                .code(),
            70
        );
        assert_eq!(
            Error::new(ErrorKind::Internal, ErrorId::Interrupt).exit_category().code(),
            130
        );
    }

    #[test]
    fn json_record_mirrors_the_human_fields() {
        let error = Error::new(ErrorKind::Script, ErrorId::ArgCount)
            .arg("add")
            .arg("2")
            .arg("1");
        let record = error.to_json();
        assert_eq!(record["kind"], "script");
        assert_eq!(record["id"], "arg-count");
        assert_eq!(record["message"], "add is missing arguments (expected 2, got 1)");
    }
}
