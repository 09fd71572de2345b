//! Recovery of the structured result from free-form model output.

use crate::types::StructuredResult;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static FENCED_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").ok());

/// Extract a [`StructuredResult`] from accumulated model output.
///
/// Tries a fenced ```` ```json ```` block first, then the span from the first
/// `{` to the last `}`. When neither parses as a JSON object the result is
/// all-empty. Never fails.
pub fn extract(text: &str) -> StructuredResult {
    for candidate in candidates(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            return from_object(map);
        }
    }

    if !text.trim().is_empty() {
        tracing::debug!(len = text.len(), "no structured payload found in model output");
    }
    StructuredResult::empty()
}

fn candidates(text: &str) -> Vec<&str> {
    let mut found = Vec::with_capacity(2);

    if let Some(captures) = FENCED_JSON.as_ref().and_then(|re| re.captures(text)) {
        if let Some(m) = captures.get(1) {
            found.push(m.as_str());
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            found.push(&text[start..=end]);
        }
    }

    found
}

/// Build a result from a parsed object, coercing the five categories to string lists.
pub fn from_object(mut map: Map<String, Value>) -> StructuredResult {
    let mut take = |key: &str| map.remove(key).map(string_list).unwrap_or_default();

    let mut result = StructuredResult {
        main_ideas: take("main_ideas"),
        methods: take("methods"),
        comparisons: take("comparisons"),
        algorithms: take("algorithms"),
        other: take("other"),
        ..StructuredResult::default()
    };

    if let Some(Value::String(error)) = map.remove("error") {
        result.error = Some(error);
    }
    result.extra = map.into_iter().collect();
    result
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    }
}
