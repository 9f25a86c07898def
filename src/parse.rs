//! JSON extraction from free-form generated text
//! Total by contract: returns `Some(object)` or `None`, never an error

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?is)```json\s*(.*?)\s*```")
        .expect("Failed to compile FENCED_JSON regex - this is a bug in the hardcoded pattern");
}

/// Extract a single JSON object from generated text.
///
/// Strategy, first success wins:
/// 1. A fenced block explicitly marked ```json
/// 2. The outermost balanced brace-delimited span
/// 3. The whole text as-is
///
/// Exhausting all three yields `None`. Callers treat that as an ordinary
/// fallback trigger, not an exceptional path.
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(caps) = FENCED_JSON.captures(text) {
        if let Some(fenced) = caps.get(1) {
            if let Some(obj) = parse_object(fenced.as_str()) {
                return Some(obj);
            }
        }
    }

    if let Some(span) = outermost_brace_span(text) {
        if let Some(obj) = parse_object(span) {
            return Some(obj);
        }
    }

    parse_object(text.trim())
}

/// Parse a candidate string, accepting only a top-level JSON object.
fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Locate the outermost `{ ... }` span by brace counting.
fn outermost_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: i32 = 0;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
