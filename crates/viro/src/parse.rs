//! The surface reader: UTF-8 source text to a flat block of values.
//!
//! The reader has no keywords: `true`, `false`, and `none` are ordinary words
//! bound in the root frame. Recognized lexical forms are integers, decimals,
//! double-quoted strings with caret escapes, brace-balanced strings, binary
//! literals `#{..}`, words, set-words, get-words, lit-words, refinement words
//! (leading `--`), blocks, parens, and dotted paths. A `.` directly after a
//! closing `]` or `)` continues into a path whose head is the bracketed
//! literal.
//!
//! Errors carry the ids the REPL keys continuation on: `unclosed-block`,
//! `unclosed-paren`, `unclosed-string`, and `unexpected-eof`.

use std::rc::Rc;

use crate::{
    error::Error,
    intern::SymbolTable,
    value::Value,
};

/// Maximum nesting depth for blocks and parens during reading. Prevents
/// stack overflow on adversarial input like `[[[[[…]]]]]`.
const MAX_NESTING_DEPTH: u16 = 120;

/// Characters that terminate a raw token.
fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'"' | b';')
}

/// Parses source text into a flat sequence of values (the top-level block).
pub fn parse_source(source: &str, symbols: &mut SymbolTable) -> Result<Vec<Value>, Error> {
    let mut parser = Parser {
        src: source,
        pos: 0,
        symbols,
        depth: 0,
    };
    parser.parse_values(None)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    symbols: &'a mut SymbolTable,
    depth: u16,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Attaches the current source line as "near" context to a reader error.
    fn err_here(&self, error: Error) -> Error {
        let line_start = self.src[..self.pos.min(self.src.len())]
            .rfind('\n')
            .map_or(0, |i| i + 1);
        let line_end = self.src[line_start..].find('\n').map_or(self.src.len(), |i| line_start + i);
        let line_number = self.src[..line_start].matches('\n').count() + 1;
        let mut error = error;
        error.set_near_if_empty(format!("line {line_number}: {}", self.src[line_start..line_end].trim()));
        error
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else if byte == b';' {
                while let Some(byte) = self.peek() {
                    self.pos += 1;
                    if byte == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Parses values until the terminator (or end of input at top level).
    fn parse_values(&mut self, terminator: Option<u8>) -> Result<Vec<Value>, Error> {
        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(byte) = self.peek() else {
                return match terminator {
                    None => Ok(values),
                    Some(b']') => Err(self.err_here(Error::unclosed_block())),
                    Some(_) => Err(self.err_here(Error::unclosed_paren())),
                };
            };
            if Some(byte) == terminator {
                self.pos += 1;
                return Ok(values);
            }
            if matches!(byte, b']' | b')' | b'}') {
                return Err(self.err_here(Error::invalid_syntax(format!("unexpected {}", byte as char))));
            }
            values.push(self.parse_value()?);
        }
    }

    fn parse_value(&mut self) -> Result<Value, Error> {
        match self.peek().expect("caller checked for input") {
            b'[' => {
                self.pos += 1;
                let items = self.parse_nested(b']')?;
                self.maybe_path_tail(Value::block(items))
            }
            b'(' => {
                self.pos += 1;
                let items = self.parse_nested(b')')?;
                self.maybe_path_tail(Value::paren(items))
            }
            b'"' => {
                self.pos += 1;
                self.parse_quoted_string()
            }
            b'{' => {
                self.pos += 1;
                self.parse_brace_string()
            }
            b'#' if self.src.as_bytes().get(self.pos + 1) == Some(&b'{') => {
                self.pos += 2;
                self.parse_binary()
            }
            b'\'' => {
                self.pos += 1;
                let token = self.read_token()?;
                let sym = self.symbols.intern(&token);
                Ok(Value::LitWord(sym))
            }
            b':' => {
                self.pos += 1;
                let token = self.read_token()?;
                let sym = self.symbols.intern(&token);
                Ok(Value::GetWord(sym))
            }
            _ => {
                let token = self.read_token()?;
                self.classify_token(&token)
            }
        }
    }

    fn parse_nested(&mut self, terminator: u8) -> Result<Vec<Value>, Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.err_here(Error::invalid_syntax("too many nested blocks")));
        }
        self.depth += 1;
        let result = self.parse_values(Some(terminator));
        self.depth -= 1;
        result
    }

    /// Continues a bracketed literal into a path when a `.` follows directly:
    /// `[1 2 3].2` reads as a path with the block as its head.
    fn maybe_path_tail(&mut self, head: Value) -> Result<Value, Error> {
        if self.peek() != Some(b'.') {
            return Ok(head);
        }
        self.pos += 1;
        let tail = self.read_token()?;
        let mut segments = vec![head];
        for segment in tail.split('.') {
            segments.push(self.path_segment(segment)?);
        }
        Ok(Value::Path(Rc::new(segments)))
    }

    fn read_token(&mut self) -> Result<String, Error> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if is_delimiter(byte) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return if self.peek().is_none() {
                Err(self.err_here(Error::unexpected_eof()))
            } else {
                Err(self.err_here(Error::invalid_syntax("expected a word")))
            };
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn classify_token(&mut self, token: &str) -> Result<Value, Error> {
        if let Some(name) = token.strip_suffix(':') {
            if name.is_empty() {
                return Err(self.err_here(Error::invalid_syntax("empty set-word")));
            }
            // Dotted set-words are set-paths; the engine splits them.
            return Ok(Value::SetWord(self.symbols.intern(name)));
        }
        if let Ok(n) = token.parse::<i64>() {
            return Ok(Value::Int(n));
        }
        if is_decimal_token(token) {
            return token
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|_| self.err_here(Error::invalid_syntax(format!("invalid number {token}"))));
        }
        if token.contains('.') && !token.starts_with("--") {
            let mut segments = Vec::new();
            for segment in token.split('.') {
                segments.push(self.path_segment(segment)?);
            }
            if segments.len() < 2 {
                return Err(self.err_here(Error::invalid_syntax(format!("invalid path {token}"))));
            }
            return Ok(Value::Path(Rc::new(segments)));
        }
        Ok(Value::Word(self.symbols.intern(token)))
    }

    fn path_segment(&mut self, segment: &str) -> Result<Value, Error> {
        if segment.is_empty() {
            return Err(self.err_here(Error::invalid_syntax("empty path segment")));
        }
        if segment.bytes().all(|b| b.is_ascii_digit()) {
            return segment
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.err_here(Error::invalid_syntax(format!("path index {segment} out of range"))));
        }
        Ok(Value::Word(self.symbols.intern(segment)))
    }

    /// Double-quoted string with caret escapes. Unknown escapes pass the
    /// character through unchanged.
    fn parse_quoted_string(&mut self) -> Result<Value, Error> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err_here(Error::unclosed_string())),
                Some(b'"') => return Ok(Value::string(&text)),
                // A quoted string cannot span lines, so a newline is a hard
                // syntax error rather than a continuation signal.
                Some(b'\n') => {
                    return Err(self.err_here(Error::invalid_syntax("string terminated by end of line")));
                }
                Some(b'^') => text.push(self.escape_char()?),
                Some(_) => {
                    let ch = self.char_at(self.pos - 1);
                    self.pos += ch.len_utf8() - 1;
                    text.push(ch);
                }
            }
        }
    }

    /// Brace string: balanced `{`/`}` nesting, newlines allowed.
    fn parse_brace_string(&mut self) -> Result<Value, Error> {
        let mut text = String::new();
        let mut nesting = 0u32;
        loop {
            match self.bump() {
                None => return Err(self.err_here(Error::unclosed_string())),
                Some(b'}') if nesting == 0 => return Ok(Value::string(&text)),
                Some(b'}') => {
                    nesting -= 1;
                    text.push('}');
                }
                Some(b'{') => {
                    nesting += 1;
                    text.push('{');
                }
                Some(b'^') => text.push(self.escape_char()?),
                Some(_) => {
                    let ch = self.char_at(self.pos - 1);
                    self.pos += ch.len_utf8() - 1;
                    text.push(ch);
                }
            }
        }
    }

    fn escape_char(&mut self) -> Result<char, Error> {
        match self.bump() {
            None => Err(self.err_here(Error::unclosed_string())),
            Some(b'/') => Ok('\n'),
            Some(b'-') => Ok('\t'),
            Some(other) => {
                let ch = self.char_at(self.pos - 1);
                self.pos += ch.len_utf8() - 1;
                let _ = other;
                Ok(ch)
            }
        }
    }

    /// Decodes the full character whose first byte sits at `index`.
    fn char_at(&self, index: usize) -> char {
        self.src[index..].chars().next().expect("index is a char boundary")
    }

    /// Binary literal body: hex digit pairs, whitespace ignored.
    fn parse_binary(&mut self) -> Result<Value, Error> {
        let mut bytes = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            match self.bump() {
                None => return Err(self.err_here(Error::unexpected_eof())),
                Some(b'}') => {
                    if pending.is_some() {
                        return Err(self.err_here(Error::invalid_syntax("odd number of hex digits in binary")));
                    }
                    return Ok(Value::Binary(Rc::from(bytes.as_slice())));
                }
                Some(byte) if byte.is_ascii_whitespace() => {}
                Some(byte) => {
                    let digit = (byte as char)
                        .to_digit(16)
                        .ok_or_else(|| self.err_here(Error::invalid_syntax("invalid hex digit in binary")))?;
                    let digit = u8::try_from(digit).expect("hex digit fits u8");
                    match pending.take() {
                        Some(high) => bytes.push(high << 4 | digit),
                        None => pending = Some(digit),
                    }
                }
            }
        }
    }
}

/// A token with exactly one interior dot and integer-parseable halves is a
/// decimal; everything else dotted is a path. `1.5` is therefore a number,
/// never a two-segment path, and exponent forms like `1.5e3` stay decimals.
fn is_decimal_token(token: &str) -> bool {
    let Some((whole, frac)) = token.split_once('.') else {
        return false;
    };
    if whole.is_empty() || frac.is_empty() || frac.contains('.') {
        return false;
    }
    let whole_ok = whole.parse::<i64>().is_ok();
    let frac_ok = frac.bytes().all(|b| b.is_ascii_digit())
        || (frac.bytes().take_while(|b| b.is_ascii_digit()).count() > 0
            && frac.trim_start_matches(|c: char| c.is_ascii_digit()).starts_with(['e', 'E'])
            && token.parse::<f64>().is_ok());
    whole_ok && frac_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorId,
        value::{Tag, Value},
    };

    fn parse_ok(source: &str) -> Vec<Value> {
        let mut symbols = SymbolTable::new();
        parse_source(source, &mut symbols).expect("source parses")
    }

    fn parse_err(source: &str) -> ErrorId {
        let mut symbols = SymbolTable::new();
        parse_source(source, &mut symbols).expect_err("source fails").id
    }

    #[test]
    fn numbers_words_and_set_words() {
        let values = parse_ok("x: 10 y -2 3.5");
        assert_eq!(values.len(), 5);
        assert_eq!(values[0].tag(), Tag::SetWord);
        assert_eq!(values[1].as_int(), Some(10));
        assert_eq!(values[2].tag(), Tag::Word);
        assert_eq!(values[3].as_int(), Some(-2));
        assert_eq!(values[4].as_decimal(), Some(3.5));
    }

    #[test]
    fn dotted_number_is_a_decimal_not_a_path() {
        let values = parse_ok("1.5");
        assert_eq!(values[0].as_decimal(), Some(1.5));
    }

    #[test]
    fn dotted_words_are_paths() {
        let values = parse_ok("obj.field.2");
        let Value::Path(segments) = &values[0] else {
            panic!("expected a path, got {values:?}");
        };
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].tag(), Tag::Word);
        assert_eq!(segments[1].tag(), Tag::Word);
        assert_eq!(segments[2].as_int(), Some(2));
    }

    #[test]
    fn block_literal_head_path() {
        let values = parse_ok("[1 2 3].2");
        let Value::Path(segments) = &values[0] else {
            panic!("expected a path, got {values:?}");
        };
        assert_eq!(segments[0].tag(), Tag::Block);
        assert_eq!(segments[1].as_int(), Some(2));
    }

    #[test]
    fn strings_and_escapes() {
        let values = parse_ok(r#""a^/b" {braced {nested} text}"#);
        assert_eq!(values[0].as_str(), Some("a\nb"));
        assert_eq!(values[1].as_str(), Some("braced {nested} text"));
    }

    #[test]
    fn binary_literal() {
        let values = parse_ok("#{DE AD beef}");
        let Value::Binary(bytes) = &values[0] else {
            panic!("expected binary, got {values:?}");
        };
        assert_eq!(bytes.as_ref(), [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn word_flavors() {
        let values = parse_ok("'lit :get --ref");
        assert_eq!(values[0].tag(), Tag::LitWord);
        assert_eq!(values[1].tag(), Tag::GetWord);
        assert_eq!(values[2].tag(), Tag::Word);
    }

    #[test]
    fn comments_are_skipped() {
        let values = parse_ok("1 ; the rest is ignored [\n2");
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].as_int(), Some(2));
    }

    #[test]
    fn continuation_error_ids() {
        assert_eq!(parse_err("[1 2"), ErrorId::UnclosedBlock);
        assert_eq!(parse_err("(1 2"), ErrorId::UnclosedParen);
        assert_eq!(parse_err("\"abc"), ErrorId::UnclosedString);
        assert_eq!(parse_err("{abc"), ErrorId::UnclosedString);
        assert_eq!(parse_err("1]"), ErrorId::InvalidSyntax);
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let mut source = String::new();
        for _ in 0..200 {
            source.push('[');
        }
        assert_eq!(parse_err(&source), ErrorId::InvalidSyntax);
    }

    #[test]
    fn reader_errors_carry_line_context() {
        let mut symbols = SymbolTable::new();
        let error = parse_source("1 2\n[3 4", &mut symbols).expect_err("unclosed");
        assert_eq!(error.near.as_deref(), Some("line 2: [3 4"));
    }
}
