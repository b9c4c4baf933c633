//! Optional-chain access into FSBid JSON.
//!
//! Upstream records routinely omit whole nested blocks (no current assignment,
//! no current position). Every accessor here resolves a missing hop to `None`.

use serde_json::Value;

/// Follows `path` through nested objects, stopping at the first missing or null hop.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|found| !found.is_null())
}

/// Reads a leaf as text. FSBid is inconsistent about quoting ids, so numbers
/// and booleans are rendered as text too.
pub fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a leaf as text, treating blank strings as absent.
pub fn non_blank_at(value: &Value, path: &[&str]) -> Option<String> {
    text_at(value, path)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// FSBid answers with a list of records, or a bare record when there is exactly one.
pub fn into_records(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    }
}
