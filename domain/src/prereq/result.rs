//! Chain execution results.

use crate::core::args::ArgMap;
use crate::mcq::McqOption;
use serde::{Deserialize, Serialize};

/// Observability record for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTrace {
    pub tool: String,
    pub success: bool,
    pub duration_ms: u64,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StepTrace {
    pub fn ran(tool: impl Into<String>, success: bool, duration_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            success,
            duration_ms,
            skipped: false,
            note: None,
        }
    }

    pub fn skipped(tool: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            duration_ms: 0,
            skipped: true,
            note: Some(note.into()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// How a chain ended. Exactly one of the three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChainOutcome {
    Passed {
        enriched_args: ArgMap,
    },
    /// Business rule violated; needs a new request, not a retry.
    Blocked {
        reason: String,
    },
    /// Suspended pending human input.
    AskUser {
        question: String,
        options: Vec<McqOption>,
        missing_field: Option<String>,
    },
}

/// Result of running a tool's pre-requisite chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreReqChainResult {
    #[serde(flatten)]
    pub outcome: ChainOutcome,
    pub steps_executed: Vec<StepTrace>,
}

impl PreReqChainResult {
    /// No chain configured: the arguments pass unchanged.
    pub fn pass_through(args: ArgMap) -> Self {
        Self {
            outcome: ChainOutcome::Passed {
                enriched_args: args,
            },
            steps_executed: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome, ChainOutcome::Passed { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.outcome, ChainOutcome::Blocked { .. })
    }

    pub fn needs_input(&self) -> bool {
        matches!(self.outcome, ChainOutcome::AskUser { .. })
    }

    /// Enriched arguments, only on a pass.
    pub fn enriched_args(&self) -> Option<&ArgMap> {
        match &self.outcome {
            ChainOutcome::Passed { enriched_args } => Some(enriched_args),
            _ => None,
        }
    }

    pub fn block_reason(&self) -> Option<&str> {
        match &self.outcome {
            ChainOutcome::Blocked { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn mcq_options(&self) -> &[McqOption] {
        match &self.outcome {
            ChainOutcome::AskUser { options, .. } => options,
            _ => &[],
        }
    }

    pub fn missing_field(&self) -> Option<&str> {
        match &self.outcome {
            ChainOutcome::AskUser { missing_field, .. } => missing_field.as_deref(),
            _ => None,
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps_executed.iter().map(|s| s.duration_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enriched_args_only_on_pass() {
        let blocked = PreReqChainResult {
            outcome: ChainOutcome::Blocked {
                reason: "paid".into(),
            },
            steps_executed: vec![StepTrace::ran("get_invoice", true, 12)],
        };
        assert!(blocked.enriched_args().is_none());
        assert_eq!(blocked.block_reason(), Some("paid"));
        assert!(!blocked.passed());

        let passed = PreReqChainResult::pass_through(ArgMap::new());
        assert!(passed.enriched_args().is_some());
        assert!(passed.steps_executed.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let result = PreReqChainResult {
            outcome: ChainOutcome::AskUser {
                question: "Which account?".into(),
                options: vec![],
                missing_field: Some("AccountId".into()),
            },
            steps_executed: vec![StepTrace::skipped("get_invoice", "condition false")],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "ask_user");
        assert_eq!(json["missingField"], "AccountId");
        assert_eq!(json["stepsExecuted"][0]["skipped"], json!(true));
    }
}
