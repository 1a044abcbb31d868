//! Reply normalization - free-form model text to `AnalysisRecord`s.
//!
//! The model is told to answer with a bare Python list of dicts, but replies
//! drift: JSON instead of Python, markdown fences, a lone dict, prose around
//! the list. Parsing is layered, cheapest first:
//!
//! 1. JSON as-is
//! 2. JSON after stripping markdown fences and language tags
//! 3. JSON after swapping single quotes for double quotes
//! 4. Python literal parse of the stripped text
//! 5. Python literal parse of the outermost bracketed span
//!
//! If every layer fails the reply yields no records. That loss is accepted:
//! callers get an empty list, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::literal;
use crate::types::AnalysisRecord;

/// A language tag only counts when whitespace or a newline follows it, so
/// ```` ```42``` ```` keeps `42` as the body.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:[A-Za-z0-9_+\-]+(?:[ \t]+|\r?\n)|[ \t]*\r?\n)?(.*?)```")
        .expect("fence pattern is valid")
});

/// Language tags seen on a line of their own ahead of the payload
const LANGUAGE_TAGS: &[&str] = &["json", "python", "py", "python3", "json5", "text", "plaintext"];

/// Which layer produced the parsed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Json,
    FenceStripped,
    QuoteSubstituted,
    Literal,
    LiteralSpan,
}

/// Parse and coerce a raw reply. Never fails; unparseable text gives `[]`.
pub fn normalize_reply(text: &str) -> Vec<AnalysisRecord> {
    match parse_reply(text) {
        Some((value, strategy)) => {
            debug!("Reply parsed via {:?}", strategy);
            normalize_value(value)
        }
        None => {
            warn!("Could not parse model reply, returning no records: {}", excerpt(text, 200));
            Vec::new()
        }
    }
}

/// Run the fallback chain. `None` when no layer could read the text.
pub fn parse_reply(text: &str) -> Option<(Value, ParseStrategy)> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some((value, ParseStrategy::Json));
    }

    let stripped = strip_code_fences(text);
    if stripped.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(&stripped) {
        return Some((value, ParseStrategy::FenceStripped));
    }

    if let Some(swapped) = substitute_quotes(&stripped) {
        if let Ok(value) = serde_json::from_str::<Value>(&swapped) {
            return Some((value, ParseStrategy::QuoteSubstituted));
        }
    }

    match literal::parse(&stripped) {
        Ok(value) => return Some((value, ParseStrategy::Literal)),
        Err(e) => debug!("Literal parse failed: {}", e),
    }

    let span = bracketed_span(&stripped)?;
    if span.len() == stripped.len() {
        return None;
    }
    literal::parse(span)
        .ok()
        .map(|value| (value, ParseStrategy::LiteralSpan))
}

/// Remove markdown fences and a leading language tag.
///
/// A fenced block anywhere in the text wins; otherwise a dangling opening
/// fence (reply cut short) is dropped along with its tag.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();

    let body = if let Some(caps) = FENCED_BLOCK.captures(trimmed) {
        caps.get(1).map(|m| m.as_str()).unwrap_or("")
    } else if let Some(after) = trimmed.strip_prefix("```") {
        after
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or("")
    } else {
        trimmed
    };

    let body = body.trim();
    let body = match body.split_once('\n') {
        Some((first, rest)) if is_language_tag(first) => rest.trim(),
        _ => body,
    };
    body.trim_end_matches("```").trim().to_string()
}

fn is_language_tag(line: &str) -> bool {
    let line = line.trim().to_ascii_lowercase();
    LANGUAGE_TAGS.iter().any(|tag| *tag == line)
}

/// Swap `'` for `"`, only when the swap cannot change string content.
///
/// Text holding a `"` or a backslash is left to the literal parser: there a
/// swapped quote could land inside a string or turn `\'` into `\"`. Python
/// constants are not rewritten, so `True` fails JSON and falls through too.
pub fn substitute_quotes(text: &str) -> Option<String> {
    if text.contains('"') || text.contains('\\') || !text.contains('\'') {
        return None;
    }
    Some(text.replace('\'', "\""))
}

/// Outermost `[...]` or `{...}` span, whichever opens first
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let close = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Coerce any parsed value into records.
///
/// Lists map element-wise, a lone dict becomes a one-element list, `null`
/// yields nothing, and any other scalar is wrapped as a fallback record.
pub fn normalize_value(value: Value) -> Vec<AnalysisRecord> {
    match value {
        Value::Array(items) => items.into_iter().map(coerce_item).collect(),
        Value::Object(map) => vec![coerce_object(map)],
        Value::Null => Vec::new(),
        other => vec![fallback_record(&other)],
    }
}

fn coerce_item(item: Value) -> AnalysisRecord {
    match item {
        Value::Object(map) => coerce_object(map),
        other => fallback_record(&other),
    }
}

fn coerce_object(map: Map<String, Value>) -> AnalysisRecord {
    let expr = map.get("expr").map(literal::py_str).unwrap_or_default();
    let result = map.get("result").map(literal::py_str).unwrap_or_default();
    let assign = map.get("assign").map(truthy).unwrap_or(false);
    AnalysisRecord::new(expr, result, assign)
}

fn fallback_record(value: &Value) -> AnalysisRecord {
    AnalysisRecord::new("", literal::py_str(value), false)
}

/// Truthiness for `assign`. Strings are read as flags rather than by length.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
