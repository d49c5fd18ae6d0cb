//! Sub-call result parsing.
//!
//! Read tools answer in many shapes: a bare record, a bare array, or either
//! wrapped in an envelope (`{"data": ...}`, `{"Invoices": [...]}`). Steps
//! only ever see the unwrapped payload.

use crate::core::args::normalize_key;
use serde_json::{Map, Value};

/// Envelope keys unwrapped whenever they hold an object or array.
const GENERIC_ENVELOPES: [&str; 7] = [
    "data", "result", "results", "items", "records", "value", "payload",
];

/// Collection keys unwrapped only when the surrounding object is not itself
/// a record (it carries no `*ID` key other than a plain `Id`).
const ENTITY_ENVELOPES: [&str; 6] = [
    "invoices",
    "contacts",
    "accounts",
    "payments",
    "creditnotes",
    "banktransactions",
];

const MAX_UNWRAP: usize = 4;

/// Parse a raw tool result. Non-JSON text is kept as a string value.
pub fn parse_result(raw: &str) -> Value {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => unwrap_envelope(value),
        Err(_) => Value::String(trimmed.to_string()),
    }
}

/// Strip known envelope layers.
pub fn unwrap_envelope(mut value: Value) -> Value {
    for _ in 0..MAX_UNWRAP {
        let Value::Object(map) = &value else {
            break;
        };
        let Some(key) = envelope_key(map) else {
            break;
        };
        let Some(inner) = map.get(&key).cloned() else {
            break;
        };
        value = inner;
    }
    value
}

fn envelope_key(map: &Map<String, Value>) -> Option<String> {
    let generic = map.iter().find(|(k, v)| {
        GENERIC_ENVELOPES.contains(&normalize_key(k).as_str()) && (v.is_object() || v.is_array())
    });
    if let Some((k, _)) = generic {
        return Some(k.clone());
    }

    if looks_like_record(map) {
        return None;
    }
    map.iter()
        .find(|(k, v)| ENTITY_ENVELOPES.contains(&normalize_key(k).as_str()) && v.is_array())
        .map(|(k, _)| k.clone())
}

fn looks_like_record(map: &Map<String, Value>) -> bool {
    map.keys().any(|k| {
        (k.ends_with("ID") || k.ends_with("Id") || k.ends_with("_id")) && normalize_key(k) != "id"
    })
}

/// Iterate a payload as records: array items, or a single object.
pub fn records(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

pub fn first_record(value: &Value) -> Option<&Value> {
    records(value).into_iter().next()
}
