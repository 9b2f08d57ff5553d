//! Turning raw completion text into content items.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use waypoint_core::ContentItem;

use crate::prompts::ResponseContract;

static WHOLE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```\s*$")
        .unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
});

static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```")
        .unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
});

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("empty completion")]
    Empty,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected JSON shape: {0}")]
    Shape(&'static str),
}

/// If the whole text is one fenced code block, return its body. Otherwise
/// return the trimmed text.
pub fn strip_code_fence(text: &str) -> &str {
    fenced_body(&WHOLE_FENCE, text).unwrap_or(text).trim()
}

/// Like [`strip_code_fence`], but also finds a fenced block surrounded by prose.
fn extract_json_block(text: &str) -> &str {
    fenced_body(&WHOLE_FENCE, text)
        .or_else(|| fenced_body(&ANY_FENCE, text))
        .unwrap_or(text)
        .trim()
}

fn fenced_body<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Parse a completion according to its prompt's contract.
pub fn parse_completion(
    raw: &str,
    contract: &ResponseContract,
) -> Result<Vec<ContentItem>, ParseError> {
    let body = match contract {
        ResponseContract::Text { .. } => strip_code_fence(raw),
        ResponseContract::FactList => extract_json_block(raw),
    };
    if body.is_empty() {
        return Err(ParseError::Empty);
    }

    match contract {
        ResponseContract::Text { title } => Ok(vec![ContentItem::new(title.clone(), body)]),
        ResponseContract::FactList => parse_fact_list(body),
    }
}

/// Accepts an array of items, a single item object, or an object wrapping
/// one array of items (e.g. `{"facts": [...]}`).
fn parse_fact_list(body: &str) -> Result<Vec<ContentItem>, ParseError> {
    let value: Value = serde_json::from_str(body)?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(map) if map.contains_key("title") => Value::Array(vec![Value::Object(map)]),
        Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| v)
            .find(Value::is_array)
            .ok_or(ParseError::Shape("object without an item list"))?,
        _ => return Err(ParseError::Shape("expected an array of facts")),
    };

    let items: Vec<ContentItem> = serde_json::from_value(list)?;
    Ok(items
        .into_iter()
        .filter(|item| !item.title.trim().is_empty() && !item.description.trim().is_empty())
        .collect())
}
