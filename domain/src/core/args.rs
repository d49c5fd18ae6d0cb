//! Argument bags and key-insensitive lookups.
//!
//! Tool arguments arrive as JSON objects whose key spelling depends on who
//! produced them: the remote schema says `InvoiceID`, an LLM may emit
//! `invoice_id` or `invoiceId`. Every lookup in the validation layers goes
//! through [`find`] / [`get_path`], which compare keys after
//! [`normalize_key`] (lowercased, `_`, `-` and spaces removed).

use serde_json::{Map, Value};

/// Arguments of a tool call.
pub type ArgMap = Map<String, Value>;

/// Transient key/value state shared by the steps of one chain execution.
pub type ChainData = Map<String, Value>;

/// Canonical form of an argument key used for comparisons.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Find the actual key in `args` that matches `key` after normalization.
///
/// An exact match wins over a normalized one.
pub fn find_key<'a>(args: &'a ArgMap, key: &str) -> Option<&'a String> {
    if let Some((k, _)) = args.get_key_value(key) {
        return Some(k);
    }
    let wanted = normalize_key(key);
    args.keys().find(|k| normalize_key(k) == wanted)
}

/// Look up an argument by key, ignoring case and separators.
pub fn find<'a>(args: &'a ArgMap, key: &str) -> Option<&'a Value> {
    find_key(args, key).and_then(|k| args.get(k))
}

/// Look up the first of several alternative keys that carries a value.
pub fn find_any<'a>(args: &'a ArgMap, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| find(args, k))
        .find(|v| is_present(v))
}

/// Whether a value counts as "provided": not null, not an empty string,
/// not an empty array.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

/// Whether `args` carries a provided value for `key`.
pub fn has_value(args: &ArgMap, key: &str) -> bool {
    find(args, key).is_some_and(is_present)
}

/// Insert or replace an argument, reusing an existing key spelling when one
/// normalizes to the same name.
pub fn set(args: &mut ArgMap, key: &str, value: Value) {
    let existing = find_key(args, key).cloned();
    match existing {
        Some(k) => {
            args.insert(k, value);
        }
        None => {
            args.insert(key.to_string(), value);
        }
    }
}

/// Resolve a dotted path (`Contact.ContactID`, `Lines.0.Amount`) inside a
/// JSON value. Object keys are matched with [`normalize_key`]; numeric
/// segments index arrays.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => find(map, segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Read a value as a number, accepting numeric strings (`"1,250.00"`).
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Read a scalar value as display text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a path as text, trimming and discarding empty strings.
pub fn text_at(value: &Value, path: &str) -> Option<String> {
    get_path(value, path)
        .and_then(as_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
