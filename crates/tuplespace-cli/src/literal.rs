//! Tuple literals: `(42u, -3i, 1.5f, true, "text", ?s)`.
//!
//! Numbers carry a type suffix (`u`, `i`, `f`); wildcards are `?` followed
//! by the same suffix letters plus `b` and `s`. Strings use Rust escape
//! syntax, so any tuple's `Display` output parses back to the same tuple.

use std::{iter::Peekable, str::CharIndices};

use thiserror::Error;
use tuplespace_proto::{Field, FieldType, ProtocolError, Tuple};

/// Tuple literal syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    /// Expected `(` to open the tuple
    #[error("expected '(' at {0}")]
    ExpectedOpen(usize),

    /// Expected `,` or `)` after a field
    #[error("expected ',' or ')' at {0}")]
    ExpectedSeparator(usize),

    /// Input ended inside the literal
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// Text after the closing `)`
    #[error("trailing input at {0}")]
    Trailing(usize),

    /// Field token that is not a value or wildcard
    #[error("invalid field {0:?}")]
    InvalidField(String),

    /// Unknown escape sequence in a string
    #[error("invalid escape at {0}")]
    InvalidEscape(usize),

    /// Zero or more than 16 fields
    #[error(transparent)]
    Arity(#[from] ProtocolError),
}

/// Parse one tuple literal. Surrounding whitespace is ignored.
pub fn parse_tuple(input: &str) -> Result<Tuple, LiteralError> {
    let mut parser = Parser { input, chars: input.char_indices().peekable() };
    let tuple = parser.tuple()?;
    parser.skip_whitespace();
    match parser.chars.peek() {
        None => Ok(tuple),
        Some(&(pos, _)) => Err(LiteralError::Trailing(pos)),
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn tuple(&mut self) -> Result<Tuple, LiteralError> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, '(')) => {},
            Some((pos, _)) => return Err(LiteralError::ExpectedOpen(pos)),
            None => return Err(LiteralError::UnexpectedEnd),
        }

        let mut fields = Vec::new();
        loop {
            self.skip_whitespace();
            fields.push(self.field()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {},
                Some((_, ')')) => break,
                Some((pos, _)) => return Err(LiteralError::ExpectedSeparator(pos)),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
        Ok(Tuple::new(fields)?)
    }

    fn field(&mut self) -> Result<Field, LiteralError> {
        match self.chars.peek() {
            Some(&(_, '"')) => self.string(),
            Some(_) => {
                let token = self.bare_token();
                bare_field(token).ok_or_else(|| LiteralError::InvalidField(token.to_owned()))
            },
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    /// Everything up to the next separator or whitespace.
    fn bare_token(&mut self) -> &'a str {
        let start = self.chars.peek().map_or(self.input.len(), |&(pos, _)| pos);
        let mut end = start;
        while let Some(&(pos, c)) = self.chars.peek() {
            if c == ',' || c == ')' || c.is_whitespace() {
                break;
            }
            end = pos + c.len_utf8();
            self.chars.next();
        }
        &self.input[start..end]
    }

    fn string(&mut self) -> Result<Field, LiteralError> {
        self.chars.next();
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Field::string(value)),
                Some((pos, '\\')) => value.push(self.escape(pos)?),
                Some((_, c)) => value.push(c),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn escape(&mut self, pos: usize) -> Result<char, LiteralError> {
        let Some((_, c)) = self.chars.next() else {
            return Err(LiteralError::UnexpectedEnd);
        };
        Ok(match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            '\\' | '"' | '\'' => c,
            'u' => self.unicode_escape(pos)?,
            _ => return Err(LiteralError::InvalidEscape(pos)),
        })
    }

    /// `\u{XXXX}`, as written by `{:?}`.
    fn unicode_escape(&mut self, pos: usize) -> Result<char, LiteralError> {
        if !matches!(self.chars.next(), Some((_, '{'))) {
            return Err(LiteralError::InvalidEscape(pos));
        }
        let mut code = String::new();
        loop {
            match self.chars.next() {
                Some((_, '}')) => break,
                Some((_, c)) if c.is_ascii_hexdigit() && code.len() < 6 => code.push(c),
                Some(_) => return Err(LiteralError::InvalidEscape(pos)),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
        u32::from_str_radix(&code, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or(LiteralError::InvalidEscape(pos))
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
    }
}

/// Wildcard, boolean or suffixed number.
fn bare_field(token: &str) -> Option<Field> {
    match token {
        "true" => return Some(Field::bool(true)),
        "false" => return Some(Field::bool(false)),
        _ => {},
    }
    if let Some(suffix) = token.strip_prefix('?') {
        let mut chars = suffix.chars();
        let field_type = FieldType::from_suffix(chars.next()?)?;
        return chars.next().is_none().then_some(Field::wildcard(field_type));
    }

    let suffix = token.chars().last()?;
    let number = &token[..token.len() - suffix.len_utf8()];
    match FieldType::from_suffix(suffix)? {
        FieldType::Uint => number.parse().ok().map(Field::uint),
        FieldType::Int => number.parse().ok().map(Field::int),
        FieldType::Float => number.parse().ok().map(Field::float),
        FieldType::Bool | FieldType::String => None,
    }
}
