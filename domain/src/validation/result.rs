//! Validation result value object

use crate::core::args::ArgMap;
use serde::{Deserialize, Serialize};

/// Outcome of a Layer 1 validation. Produced per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Cleaned-up arguments, only present when `valid`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_args: Option<ArgMap>,
}

impl ValidationResult {
    /// A passing result with nothing to report (used for read tools).
    pub fn always_valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            sanitized_args: None,
        }
    }

    /// Build a result from accumulated findings. Sanitized arguments are
    /// dropped when there are errors.
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>, sanitized: ArgMap) -> Self {
        let valid = errors.is_empty();
        Self {
            valid,
            errors,
            warnings,
            sanitized_args: valid.then_some(sanitized),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// All errors joined for a single-line message.
    pub fn error_summary(&self) -> String {
        self.errors.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_findings_drops_sanitized_on_error() {
        let result = ValidationResult::from_findings(
            vec!["Amount must not be negative".into()],
            vec![],
            ArgMap::new(),
        );
        assert!(!result.valid);
        assert!(result.sanitized_args.is_none());
        assert_eq!(result.error_summary(), "Amount must not be negative");
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = ValidationResult::from_findings(vec![], vec!["w".into()], ArgMap::new());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valid"], true);
        assert!(json.get("sanitizedArgs").is_some());
    }
}
