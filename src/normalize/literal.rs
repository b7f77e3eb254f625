//! Python literal reader
//!
//! Models that were asked for JSON sometimes answer with a Python dict
//! (`{'a': True, 'b': None}`). This module reads the literal subset of Python
//! expression syntax: dicts, lists, tuples, sets, strings, numbers,
//! `True`/`False`/`None` and unary signs. Anything else (names, calls,
//! operators, bytes, f-strings, complex numbers) is rejected.

use serde_json::{Map, Number, Value};

/// A parsed Python literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

/// Syntax error with the character offset where reading stopped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    pub offset: usize,
}

/// A literal that parsed but has no JSON equivalent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("sets cannot be represented as JSON")]
    Set,
    #[error("dictionary keys must be str, int, float, bool or None")]
    UnsupportedKey,
    #[error("non-finite float {0}")]
    NonFinite(String),
}

impl Literal {
    pub fn is_dict(&self) -> bool {
        matches!(self, Literal::Dict(_))
    }

    /// Convert to JSON using the usual encoder conventions: tuples become
    /// arrays, scalar keys are stringified (`True` becomes `"true"`).
    pub fn into_json(self) -> Result<Value, ConversionError> {
        Ok(match self {
            Literal::None => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => int_to_json(i)?,
            Literal::Float(f) => float_to_json(f)?,
            Literal::Str(s) => Value::String(s),
            Literal::List(items) | Literal::Tuple(items) => Value::Array(
                items
                    .into_iter()
                    .map(Literal::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Literal::Set(_) => return Err(ConversionError::Set),
            Literal::Dict(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.into_json_key()?, value.into_json()?);
                }
                Value::Object(map)
            }
        })
    }

    fn into_json_key(self) -> Result<String, ConversionError> {
        match self {
            Literal::Str(s) => Ok(s),
            Literal::Bool(true) => Ok("true".to_string()),
            Literal::Bool(false) => Ok("false".to_string()),
            Literal::None => Ok("null".to_string()),
            Literal::Int(i) => Ok(i.to_string()),
            Literal::Float(f) => match float_to_json(f)? {
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(ConversionError::UnsupportedKey),
            },
            _ => Err(ConversionError::UnsupportedKey),
        }
    }
}

fn int_to_json(i: i128) -> Result<Value, ConversionError> {
    if let Ok(v) = i64::try_from(i) {
        return Ok(Value::Number(v.into()));
    }
    if let Ok(v) = u64::try_from(i) {
        return Ok(Value::Number(v.into()));
    }
    float_to_json(i as f64)
}

fn float_to_json(f: f64) -> Result<Value, ConversionError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ConversionError::NonFinite(f.to_string()))
}

/// Parse a complete Python literal expression.
pub fn parse(text: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser::new(text);
    parser.skip_trivia();
    let first = parser.expression()?;
    parser.skip_trivia();

    // A bare `1, 2` is a tuple in expression context.
    let value = if parser.peek() == Some(',') {
        let mut items = vec![first];
        while parser.eat(',') {
            parser.skip_trivia();
            if parser.at_end() {
                break;
            }
            items.push(parser.expression()?);
            parser.skip_trivia();
        }
        Literal::Tuple(items)
    } else {
        first
    };

    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Deepest container or unary-sign nesting accepted, as in CPython's parser.
pub const MAX_DEPTH: usize = 200;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            message: message.into(),
            offset: self.pos,
        }
    }

    /// Skip whitespace, comments and backslash line continuations.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\n' | '\r' | '\x0c' => self.pos += 1,
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '\\' if matches!(self.peek_at(1), Some('\n') | Some('\r')) => self.pos += 2,
                _ => break,
            }
        }
    }

    fn expression(&mut self) -> Result<Literal, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("too many nested parentheses"));
        }
        self.depth += 1;
        let result = self.atom();
        self.depth -= 1;
        result
    }

    fn atom(&mut self) -> Result<Literal, LiteralError> {
        match self.peek() {
            Some('-') | Some('+') => {
                let negate = self.bump() == Some('-');
                self.skip_trivia();
                match self.expression()? {
                    Literal::Int(i) => Ok(Literal::Int(if negate { -i } else { i })),
                    Literal::Float(f) => Ok(Literal::Float(if negate { -f } else { f })),
                    _ => Err(self.error("unary sign applied to a non-number")),
                }
            }
            Some('[') => {
                self.pos += 1;
                Ok(Literal::List(self.sequence(']')?))
            }
            Some('(') => self.parenthesized(),
            Some('{') => self.braced(),
            Some('\'') | Some('"') => self.strings(),
            Some(c) if c.is_ascii_digit() => self.number(),
            Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Comma-separated items up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: char) -> Result<Vec<Literal>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            if !self.eat(',') {
                return Err(self.error(format!("expected ',' or '{}'", close)));
            }
        }
    }

    fn parenthesized(&mut self) -> Result<Literal, LiteralError> {
        self.pos += 1;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(Literal::Tuple(Vec::new()));
        }
        let first = self.expression()?;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.sequence(')')?);
        Ok(Literal::Tuple(items))
    }

    fn braced(&mut self) -> Result<Literal, LiteralError> {
        self.pos += 1;
        self.skip_trivia();
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.expression()?;
        self.skip_trivia();
        if !self.eat(':') {
            // Set display
            if self.eat('}') {
                return Ok(Literal::Set(vec![first]));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',', ':' or '}'"));
            }
            let mut items = vec![first];
            items.extend(self.sequence('}')?);
            return Ok(Literal::Set(items));
        }

        let mut entries = Vec::new();
        let mut key = first;
        loop {
            self.skip_trivia();
            let value = self.expression()?;
            if !is_hashable(&key) {
                return Err(self.error("unhashable dictionary key"));
            }
            entries.push((key, value));
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Literal::Dict(entries));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or '}'"));
            }
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Literal::Dict(entries));
            }
            key = self.expression()?;
            self.skip_trivia();
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
        }
    }

    fn name(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('\'') | Some('"')) {
            return match word.to_ascii_lowercase().as_str() {
                "r" | "u" => {
                    self.pos = start;
                    self.strings()
                }
                _ => Err(self.error(format!("unsupported string prefix '{}'", word))),
            };
        }

        match word.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => Err(LiteralError {
                message: format!("name '{}' is not a literal", word),
                offset: start,
            }),
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Literal, LiteralError> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_trivia();
            let next_is_string = match self.peek() {
                Some('\'') | Some('"') => true,
                Some(c) if matches!(c, 'r' | 'R' | 'u' | 'U') => {
                    matches!(self.peek_at(1), Some('\'') | Some('"'))
                }
                _ => false,
            };
            if !next_is_string {
                self.pos = save;
                return Ok(Literal::Str(out));
            }
            out.push_str(&self.string()?);
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let mut raw = false;
        if let Some(c) = self.peek() {
            match c {
                'r' | 'R' => {
                    raw = true;
                    self.pos += 1;
                }
                'u' | 'U' => self.pos += 1,
                _ => {}
            }
        }

        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }

            match c {
                '\n' if !triple => return Err(self.error("newline in single-quoted string")),
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.escape(&mut out)?,
                _ => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape"))?;
        match c {
            '\n' => {}
            '\r' => {
                self.eat('\n');
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            'x' => out.push(self.hex_escape(2)?),
            'u' => out.push(self.hex_escape(4)?),
            'U' => out.push(self.hex_escape(8)?),
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                let ch = char::from_u32(value).ok_or_else(|| self.error("invalid octal escape"))?;
                out.push(ch);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let mut value = 0u32;
        for _ in 0..digits {
            let d = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("truncated hex escape"))?;
            value = value * 16 + d;
            self.pos += 1;
        }
        char::from_u32(value).ok_or_else(|| self.error("invalid code point"))
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits = self.digits(|c| c.is_digit(radix));
                if digits.is_empty() {
                    return Err(self.error("missing digits after radix prefix"));
                }
                self.reject_suffix()?;
                return i128::from_str_radix(&digits, radix)
                    .map(Literal::Int)
                    .map_err(|_| self.error("integer literal too large"));
            }
        }

        let mut text = self.digits(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.peek() == Some('.') {
            self.pos += 1;
            text.push('.');
            text.push_str(&self.digits(|c| c.is_ascii_digit()));
            is_float = true;
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = self.pos;
            self.pos += 1;
            let mut exp = String::from("e");
            if let Some(sign @ ('+' | '-')) = self.peek() {
                exp.push(sign);
                self.pos += 1;
            }
            let digits = self.digits(|c| c.is_ascii_digit());
            if digits.is_empty() {
                self.pos = save;
            } else {
                exp.push_str(&digits);
                text.push_str(&exp);
                is_float = true;
            }
        }

        if matches!(self.peek(), Some('j') | Some('J')) {
            return Err(LiteralError {
                message: "complex numbers are not supported".to_string(),
                offset: start,
            });
        }
        self.reject_suffix()?;

        if is_float {
            return text
                .parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| self.error("invalid float literal"));
        }
        match text.parse::<i128>() {
            Ok(i) => Ok(Literal::Int(i)),
            Err(_) => text
                .parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| self.error("invalid integer literal")),
        }
    }

    /// Digits accepted by `accept`, with `_` separators removed.
    fn digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if accept(c) {
                out.push(c);
            } else if c != '_' || !self.peek_at(1).is_some_and(&accept) {
                break;
            }
            self.pos += 1;
        }
        out
    }

    fn reject_suffix(&self) -> Result<(), LiteralError> {
        match self.peek() {
            Some(c) if c.is_alphanumeric() || c == '_' => {
                Err(self.error("invalid character after number"))
            }
            _ => Ok(()),
        }
    }
}

fn is_hashable(key: &Literal) -> bool {
    match key {
        Literal::List(_) | Literal::Dict(_) | Literal::Set(_) => false,
        Literal::Tuple(items) => items.iter().all(is_hashable),
        _ => true,
    }
}
