//! Python literal parser.
//!
//! Models asked for "a Python list of dictionaries" answer with Python
//! syntax: single quotes, `True`/`None`, tuples, trailing commas. This module
//! reads that subset into `serde_json::Value` so the normalizer can treat it
//! like any other JSON reply.
//!
//! Accepted grammar (roughly what `ast.literal_eval` takes for data):
//! - lists, tuples and sets (all become arrays), dicts
//! - strings in `'`, `"`, `'''`, `"""` with `r`/`u`/`b` prefixes, escapes,
//!   and implicit concatenation of adjacent strings
//! - ints (decimal, `0x`, `0o`, `0b`, `_` separators), floats, unary `+`/`-`
//! - `True`, `False`, `None` (JSON spellings are tolerated too)
//! - `#` comments and a bare top-level tuple (`1, 2`)
//!
//! Integers that do not fit in 64 bits are kept as their digit string.
//! Nesting deeper than [`MAX_DEPTH`] is rejected rather than recursed into.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Container nesting limit, same as serde_json's
pub const MAX_DEPTH: usize = 128;

/// Parse failure with the byte offset where it happened
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parse a complete Python literal.
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    parser.skip_trivia();
    if parser.at_end() {
        return Err(parser.error("empty input"));
    }

    let first = parser.parse_value()?;
    parser.skip_trivia();

    let value = if parser.eat(',') {
        let mut items = vec![first];
        loop {
            parser.skip_trivia();
            if parser.at_end() {
                break;
            }
            items.push(parser.parse_value()?);
            parser.skip_trivia();
            if !parser.eat(',') {
                break;
            }
        }
        Value::Array(items)
    } else {
        first
    };

    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Render a value the way Python's `str()` would for the common cases.
///
/// Strings are returned verbatim, numbers as their numeric text, booleans and
/// null in Python spelling. Containers fall back to compact JSON.
pub fn py_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

enum Num {
    Int(i128),
    Float(f64),
    /// Out of range; keep the source text
    Text(String),
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('\\') if matches!(self.peek_nth(1), Some('\n') | Some('\r')) => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        self.skip_trivia();
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => self.nested(|p| p.parse_items(']').map(Value::Array)),
            Some('(') => self.nested(Self::parse_paren),
            Some('{') => self.nested(Self::parse_brace),
            Some('\'') | Some('"') => self.parse_strings(),
            Some('-') | Some('+') => self.parse_signed(),
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let num = self.parse_number()?;
                Ok(num_to_value(num))
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                if self.string_prefix_len().is_some() {
                    self.parse_strings()
                } else {
                    self.parse_name()
                }
            }
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
        }
    }

    /// Consume an opening bracket and parse its contents one level deeper
    fn nested<F>(&mut self, parse_inner: F) -> Result<Value, LiteralError>
    where
        F: FnOnce(&mut Self) -> Result<Value, LiteralError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.bump();
        self.depth += 1;
        let value = parse_inner(self);
        self.depth -= 1;
        value
    }

    /// Comma separated values up to `close`, trailing comma allowed
    fn parse_items(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.eat(',') {
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }

    /// `()` tuple, `(x)` grouping, `(x,)` / `(x, y)` tuple
    fn parse_paren(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.parse_value()?;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        items.extend(self.parse_items(')')?);
        Ok(Value::Array(items))
    }

    /// `{}` dict, `{k: v, ...}` dict, `{a, b}` set
    fn parse_brace(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        if self.eat('}') {
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value()?;
        self.skip_trivia();
        if !self.eat(':') {
            let mut items = vec![first];
            if self.eat(',') {
                items.extend(self.parse_items('}')?);
            } else {
                self.expect('}')?;
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let value = self.parse_value()?;
        map.insert(key_text(first), value);
        loop {
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            self.expect(',')?;
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key = self.parse_value()?;
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key_text(key), value);
        }
    }

    fn parse_name(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            name => {
                self.pos = start;
                Err(self.error(&format!("unsupported name '{}'", name)))
            }
        }
    }

    fn parse_signed(&mut self) -> Result<Value, LiteralError> {
        let mut negative = false;
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('-') => negative = !negative,
                Some('+') => {}
                _ => break,
            }
            self.bump();
        }
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => {}
            _ => return Err(self.error("unary operator must precede a number")),
        }

        let num = match self.parse_number()? {
            Num::Int(i) if negative => Num::Int(-i),
            Num::Float(f) if negative => Num::Float(-f),
            Num::Text(t) if negative => Num::Text(format!("-{}", t)),
            other => other,
        };
        Ok(num_to_value(num))
    }

    fn parse_number(&mut self) -> Result<Num, LiteralError> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix != 10 {
            self.pos += 2;
            let digits_start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_digit(radix) || c == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            let digits: String = self.src[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            if digits.is_empty() {
                return Err(self.error("missing digits after radix prefix"));
            }
            return Ok(match i128::from_str_radix(&digits, radix) {
                Ok(i) => Num::Int(i),
                Err(_) => Num::Text(self.src[start..self.pos].to_string()),
            });
        }

        let mut is_float = false;
        self.eat_digits();
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let save = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                self.eat_digits();
            } else {
                self.pos = save;
            }
        }
        if matches!(self.peek(), Some('j' | 'J')) {
            return Err(self.error("complex numbers are not supported"));
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if text == "." || text.is_empty() {
            self.pos = start;
            return Err(self.error("malformed number"));
        }

        if is_float {
            let f: f64 = text.parse().map_err(|_| self.error("malformed float"))?;
            if f.is_finite() {
                Ok(Num::Float(f))
            } else {
                Ok(Num::Text(text))
            }
        } else {
            Ok(match text.parse::<i128>() {
                Ok(i) => Num::Int(i),
                Err(_) => Num::Text(text),
            })
        }
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Length in bytes of a string prefix (`r`, `u`, `b`, `rb`, `br`) that is
    /// directly followed by a quote
    fn string_prefix_len(&self) -> Option<usize> {
        let rest = self.rest();
        let prefix_len = rest
            .chars()
            .take_while(|c| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B'))
            .count();
        if prefix_len == 0 || prefix_len > 2 {
            return None;
        }
        let prefix = rest[..prefix_len].to_ascii_lowercase();
        if !matches!(prefix.as_str(), "r" | "u" | "b" | "rb" | "br") {
            return None;
        }
        match rest[prefix_len..].chars().next() {
            Some('\'') | Some('"') => Some(prefix_len),
            _ => None,
        }
    }

    /// One or more adjacent string literals, concatenated
    fn parse_strings(&mut self) -> Result<Value, LiteralError> {
        let mut out = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_trivia();
            let starts_string = matches!(self.peek(), Some('\'') | Some('"'))
                || self.string_prefix_len().is_some();
            if !starts_string {
                self.pos = save;
                break;
            }
            out.push_str(&self.parse_string()?);
        }
        Ok(Value::String(out))
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let mut raw = false;
        if let Some(len) = self.string_prefix_len() {
            raw = self.src[self.pos..self.pos + len]
                .chars()
                .any(|c| c == 'r' || c == 'R');
            self.pos += len;
        }

        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected string")),
        };
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.pos += 2 * quote.len_utf8();
        }
        let open = self.pos;

        let mut out = String::new();
        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => {
                    self.pos = open;
                    return Err(self.error("unterminated string"));
                }
            };

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                    self.pos += 2 * quote.len_utf8();
                    return Ok(out);
                }
                out.push(c);
                continue;
            }

            if c != '\\' {
                out.push(c);
                continue;
            }

            if raw {
                // Raw strings keep the backslash but still cannot end on an escaped quote
                out.push('\\');
                if let Some(next) = self.bump() {
                    out.push(next);
                }
                continue;
            }

            self.parse_escape(&mut out)?;
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated escape"));
        };
        match c {
            '\n' => {}
            '\r' => {
                self.eat('\n');
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.parse_hex_escape(2)?),
            'u' => out.push(self.parse_hex_escape(4)?),
            'U' => out.push(self.parse_hex_escape(8)?),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn parse_hex_escape(&mut self, len: usize) -> Result<char, LiteralError> {
        let end = self.pos + len;
        let digits = self
            .src
            .get(self.pos..end)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("truncated hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("bad hex escape"))?;
        let ch = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
        self.pos = end;
        Ok(ch)
    }
}

fn num_to_value(num: Num) -> Value {
    match num {
        Num::Int(i) => {
            if let Ok(v) = i64::try_from(i) {
                Value::Number(v.into())
            } else if let Ok(v) = u64::try_from(i) {
                Value::Number(v.into())
            } else {
                Value::String(i.to_string())
            }
        }
        Num::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        Num::Text(t) => Value::String(t),
    }
}

fn key_text(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => py_str(&other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_python_list_of_dicts() {
        let value = parse("[{'expr': '2 + 2', 'result': 4}]").unwrap();
        assert_eq!(value, json!([{"expr": "2 + 2", "result": 4}]));
    }

    #[test]
    fn test_constants_and_trailing_commas() {
        let value = parse("[{'expr': 'x', 'result': 5, 'assign': True,}, None, False,]").unwrap();
        assert_eq!(value, json!([{"expr": "x", "result": 5, "assign": true}, null, false]));
    }

    #[test]
    fn test_json_spellings_tolerated() {
        assert_eq!(parse(r#"{"a": true, "b": null}"#).unwrap(), json!({"a": true, "b": null}));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("-3").unwrap(), json!(-3));
        assert_eq!(parse("- -3").unwrap(), json!(3));
        assert_eq!(parse("+2.5").unwrap(), json!(2.5));
        assert_eq!(parse(".5").unwrap(), json!(0.5));
        assert_eq!(parse("1e3").unwrap(), json!(1000.0));
        assert_eq!(parse("1_000").unwrap(), json!(1000));
        assert_eq!(parse("0x1F").unwrap(), json!(31));
        assert_eq!(parse("0b101").unwrap(), json!(5));
        assert_eq!(parse("0o17").unwrap(), json!(15));
    }

    #[test]
    fn test_huge_int_kept_as_text() {
        let value = parse("123456789012345678901234567890").unwrap();
        assert_eq!(value, json!("123456789012345678901234567890"));
        let value = parse("18446744073709551615").unwrap();
        assert_eq!(value, json!(18446744073709551615u64));
    }

    #[test]
    fn test_string_escapes_and_quotes() {
        assert_eq!(parse(r#"'it\'s'"#).unwrap(), json!("it's"));
        assert_eq!(parse(r#""say \"hi\"""#).unwrap(), json!("say \"hi\""));
        assert_eq!(parse(r#"'a\nb\t\x41é'"#).unwrap(), json!("a\nb\tAé"));
        assert_eq!(parse(r#"'\d'"#).unwrap(), json!("\\d"));
        assert_eq!(parse(r#"r'\sqrt{2}'"#).unwrap(), json!("\\sqrt{2}"));
        assert_eq!(parse("'x²'").unwrap(), json!("x²"));
    }

    #[test]
    fn test_triple_quoted_and_concatenated() {
        assert_eq!(parse("'''line 'one'\nline two'''").unwrap(), json!("line 'one'\nline two"));
        assert_eq!(parse("'ab' \"cd\"").unwrap(), json!("abcd"));
    }

    #[test]
    fn test_tuples_sets_and_grouping() {
        assert_eq!(parse("(1, 2)").unwrap(), json!([1, 2]));
        assert_eq!(parse("(1,)").unwrap(), json!([1]));
        assert_eq!(parse("(1)").unwrap(), json!(1));
        assert_eq!(parse("()").unwrap(), json!([]));
        assert_eq!(parse("{1, 2}").unwrap(), json!([1, 2]));
        assert_eq!(parse("{}").unwrap(), json!({}));
        assert_eq!(parse("1, 2").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_non_string_keys() {
        assert_eq!(parse("{1: 'a', True: 'b', None: 'c'}").unwrap(), json!({"1": "a", "True": "b", "None": "c"}));
    }

    #[test]
    fn test_comments_ignored() {
        let value = parse("[\n  # first\n  {'expr': 'y', 'result': 6},  # trailing\n]").unwrap();
        assert_eq!(value, json!([{"expr": "y", "result": 6}]));
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("[1, 2").is_err());
        assert!(parse("'open").is_err());
        assert!(parse("[x]").is_err());
        assert!(parse("1 + 2").is_err());
        assert!(parse("3j").is_err());
        assert!(parse("-'a'").is_err());
        assert!(parse("Here is the answer: [1]").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let err = parse(&"[".repeat(10_000)).unwrap_err();
        assert_eq!(err.message, "nesting too deep");
        assert_eq!(err.offset, MAX_DEPTH);

        assert!(parse(&"({".repeat(5_000)).is_err());

        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&ok).is_ok());
        let too_deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(parse(&too_deep).is_err());
    }

    #[test]
    fn test_error_offset() {
        let err = parse("[1, 2 3]").unwrap_err();
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn test_py_str() {
        assert_eq!(py_str(&json!("text")), "text");
        assert_eq!(py_str(&json!(4)), "4");
        assert_eq!(py_str(&json!(4.5)), "4.5");
        assert_eq!(py_str(&json!(true)), "True");
        assert_eq!(py_str(&json!(null)), "None");
        assert_eq!(py_str(&json!([1, 2])), "[1,2]");
    }
}
