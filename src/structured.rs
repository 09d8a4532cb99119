//! Lenient extraction of structured data from collaborator text.
//!
//! LLM replies wrap JSON in prose, code fences, or both. Extraction tries,
//! in order:
//!
//! 1. the whole (trimmed) text as JSON
//! 2. the interior of each fenced code block, language tag optional
//! 3. the span from the first `{` or `[` to the last matching closer
//!
//! and otherwise hands the original text back as [`Extracted::Raw`].
//! Nothing here returns an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ```` ```json\n ... ``` ```` with or without a language tag.
static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Result of lenient parsing: a structured value, or the text unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Extracted {
    Structured(Value),
    Raw(String),
}

impl Extracted {
    pub fn is_structured(&self) -> bool {
        matches!(self, Extracted::Structured(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Extracted::Structured(v) => Some(v),
            Extracted::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Extracted::Structured(_) => None,
            Extracted::Raw(s) => Some(s),
        }
    }

    /// Raw text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Extracted::Structured(v) => v,
            Extracted::Raw(s) => Value::String(s),
        }
    }

    /// Text form: raw text as-is, structured values serialised compactly.
    pub fn to_text(&self) -> String {
        match self {
            Extracted::Structured(Value::String(s)) => s.clone(),
            Extracted::Structured(v) => v.to_string(),
            Extracted::Raw(s) => s.clone(),
        }
    }
}

pub fn extract_structured(text: &str) -> Extracted {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Extracted::Raw(text.to_string());
    }

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Extracted::Structured(v);
    }

    for caps in RE_FENCE.captures_iter(text) {
        if let Some(inner) = caps.get(1) {
            if let Ok(v) = serde_json::from_str::<Value>(inner.as_str().trim()) {
                return Extracted::Structured(v);
            }
        }
    }

    if let Some(v) = bracket_span(trimmed) {
        return Extracted::Structured(v);
    }

    Extracted::Raw(text.to_string())
}

/// First opener to last matching closer, trying whichever bracket type
/// appears first, then the other.
fn bracket_span(text: &str) -> Option<Value> {
    let brace = text.find('{');
    let bracket = text.find('[');
    let order: [(char, char); 2] = match (brace, bracket) {
        (Some(b), Some(k)) if k < b => [('[', ']'), ('{', '}')],
        _ => [('{', '}'), ('[', ']')],
    };

    order.iter().find_map(|&(open, close)| {
        let start = text.find(open)?;
        let end = text.rfind(close)?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<Value>(&text[start..=end]).ok()
    })
}

/// Interior of the first fenced block, or the trimmed text when unfenced.
pub fn extract_code(text: &str) -> String {
    RE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.trim().to_string())
}
