//! Layer 1 field validator.

use super::result::ValidationResult;
use super::rules::{Finding, ToolRule, default_rules};
use super::shapes;
use crate::core::args::{self, ArgMap, normalize_key};
use crate::tool::verbs::WriteVerb;
use serde_json::Value;
use std::collections::HashMap;

/// Pure validator for write-tool arguments.
///
/// Holds the tool-specific [`ToolRule`] table keyed by normalised tool name.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    rules: HashMap<String, ToolRule>,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

impl FieldValidator {
    /// A validator with no tool-specific rules (generic invariants only).
    pub fn generic() -> Self {
        Self::with_rules(Vec::new())
    }

    pub fn with_rules(rules: impl IntoIterator<Item = ToolRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| (normalize_key(&rule.tool), rule))
                .collect(),
        }
    }

    /// Add or replace the rule for one tool (builder pattern).
    pub fn with_rule(mut self, rule: ToolRule) -> Self {
        self.rules.insert(normalize_key(&rule.tool), rule);
        self
    }

    pub fn rule(&self, tool_name: &str) -> Option<&ToolRule> {
        self.rules.get(&normalize_key(tool_base_name(tool_name)))
    }

    /// Validate a call. Read tools are always valid.
    pub fn validate(&self, tool_name: &str, args: &ArgMap) -> ValidationResult {
        let Some(verb) = WriteVerb::from_tool_name(tool_name) else {
            return ValidationResult::always_valid();
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // (1) generic invariants
        if args.is_empty() {
            errors.push(format!("No arguments provided for '{tool_name}'"));
        }
        for (key, value) in args {
            check_shapes(key, key, value, &mut errors);
        }

        // (2) tool-specific rules
        if let Some(rule) = self.rule(tool_name) {
            for field in rule.missing_fields(args) {
                errors.push(format!("Missing required field: {field}"));
            }
            for (field, check) in &rule.checks {
                let Some(value) = args::find(args, field).filter(|v| !v.is_null()) else {
                    continue;
                };
                match check.check(field, value) {
                    Finding::Ok => {}
                    Finding::Error(e) => errors.push(e),
                    Finding::Warning(w) => warnings.push(w),
                }
            }
        }

        // (3) advisory for destructive verbs
        if verb.is_destructive() {
            warnings.push(format!(
                "'{tool_name}' is a destructive operation ({verb}) and cannot be undone"
            ));
        }

        ValidationResult::from_findings(errors, warnings, sanitize(args))
    }
}

fn tool_base_name(name: &str) -> &str {
    name.rsplit(['.', '/', ':']).next().unwrap_or(name)
}

/// Walk a value, checking date- and amount-shaped fields. `path` is the
/// display path used in messages (`LineItems[0].UnitAmount`).
fn check_shapes(key: &str, path: &str, value: &Value, errors: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                check_shapes(k, &format!("{path}.{k}"), v, errors);
            }
            return;
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_shapes(key, &format!("{path}[{i}]"), item, errors);
            }
            return;
        }
        Value::Null => return,
        _ => {}
    }

    if shapes::is_date_field(key) {
        match value.as_str() {
            Some(s) if shapes::parse_date(s).is_some() => {}
            Some(s) => errors.push(format!(
                "{path} '{s}' is not a valid date (expected YYYY-MM-DD or DD/MM/YYYY)"
            )),
            None => errors.push(format!("{path} must be a date string")),
        }
    } else if shapes::is_amount_field(key)
        && let Some(n) = args::as_number(value)
        && n < 0.0
    {
        // Non-numeric values (`LineAmountTypes: "Exclusive"`) are not amounts.
        errors.push(format!("{path} must not be negative (got {n})"));
    }
}

/// Trim strings and rewrite `DD/MM/YYYY` dates to ISO.
fn sanitize(args: &ArgMap) -> ArgMap {
    args.iter()
        .map(|(k, v)| (k.clone(), sanitize_value(k, v)))
        .collect()
}

fn sanitize_value(key: &str, value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if shapes::is_date_field(key)
                && let Some(iso) = shapes::normalize_date(trimmed)
            {
                return Value::String(iso);
            }
            Value::String(trimmed.to_string())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_value(k, v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| sanitize_value(key, v)).collect())
        }
        other => other.clone(),
    }
}
