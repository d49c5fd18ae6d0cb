//! MCQ entities and the status machine.

use super::builders::McqDraft;
use crate::core::args::ArgMap;
use crate::core::error::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Identifier of a persisted MCQ (time-ordered UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct McqId(Uuid);

impl McqId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DomainError::InvalidArguments(format!("invalid MCQ id '{s}': {e}")))
    }
}

impl Default for McqId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for McqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of decision the question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McqType {
    EntityResolution,
    ParameterResolution,
    WriteConfirmation,
    Disambiguation,
}

impl McqType {
    pub fn as_str(&self) -> &'static str {
        match self {
            McqType::EntityResolution => "entity_resolution",
            McqType::ParameterResolution => "parameter_resolution",
            McqType::WriteConfirmation => "write_confirmation",
            McqType::Disambiguation => "disambiguation",
        }
    }

    /// Whether an answer that matches no option is accepted as a value.
    pub fn accepts_free_text(&self) -> bool {
        matches!(
            self,
            McqType::ParameterResolution | McqType::Disambiguation
        )
    }
}

impl fmt::Display for McqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an MCQ record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McqStatus {
    Pending,
    Resolved,
    Expired,
    Cancelled,
}

impl McqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            McqStatus::Pending => "pending",
            McqStatus::Resolved => "resolved",
            McqStatus::Expired => "expired",
            McqStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, McqStatus::Pending)
    }

    /// Validate a transition. Only `Pending -> terminal` is allowed.
    pub fn transition(self, to: McqStatus) -> Result<McqStatus, DomainError> {
        if self == McqStatus::Pending && to.is_terminal() {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for McqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqOption {
    pub id: String,
    pub label: String,
    /// Value substituted into the paused write when chosen
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl McqOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An answer routed back from the calling surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum McqAnswer {
    /// An option id (or 1-based index, or label)
    Option(String),
    /// Anything the user typed
    FreeText(String),
}

/// A persisted pending decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqState {
    pub id: McqId,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub mcq_type: McqType,
    pub question: String,
    pub options: Vec<McqOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<McqOption>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub pending_tool: String,
    pub pending_args: ArgMap,
    pub status: McqStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// How many MCQs preceded this one in the same write flow
    #[serde(default)]
    pub chain_depth: u32,
    /// Write argument the answer fills in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_field: Option<String>,
}

impl McqState {
    /// Create a pending record from a draft question.
    pub fn new(
        conversation_id: impl Into<String>,
        draft: McqDraft,
        pending_tool: impl Into<String>,
        pending_args: ArgMap,
    ) -> Self {
        Self {
            id: McqId::new(),
            conversation_id: conversation_id.into(),
            entity_id: draft.entity_id,
            mcq_type: draft.mcq_type,
            question: draft.question,
            options: draft.options,
            selected_option: None,
            context: draft.context,
            pending_tool: pending_tool.into(),
            pending_args,
            status: McqStatus::Pending,
            created_at: Utc::now(),
            expires_at: None,
            chain_depth: 0,
            missing_field: draft.missing_field,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(self.created_at + ttl);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_chain_depth(mut self, depth: u32) -> Self {
        self.chain_depth = depth;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == McqStatus::Pending
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Find an option by id, 1-based index or label (case-insensitive).
    pub fn find_option(&self, key: &str) -> Option<&McqOption> {
        let key = key.trim();
        if let Some(option) = self.options.iter().find(|o| o.id == key) {
            return Some(option);
        }
        if let Ok(index) = key.parse::<usize>()
            && index >= 1
            && let Some(option) = self.options.get(index - 1)
        {
            return Some(option);
        }
        self.options
            .iter()
            .find(|o| o.id.eq_ignore_ascii_case(key) || o.label.eq_ignore_ascii_case(key))
    }

    /// Interpret an answer against this question.
    ///
    /// Returns the option to record as selected. A free-text answer matching
    /// no option becomes a synthetic option when the question type accepts
    /// free text or has no options at all.
    pub fn interpret(&self, answer: &McqAnswer) -> Result<McqOption, DomainError> {
        match answer {
            McqAnswer::Option(key) => self
                .find_option(key)
                .cloned()
                .ok_or_else(|| DomainError::UnknownOption(key.clone())),
            McqAnswer::FreeText(text) => {
                if let Some(option) = self.find_option(text) {
                    return Ok(option.clone());
                }
                let text = text.trim();
                if !text.is_empty() && (self.options.is_empty() || self.mcq_type.accepts_free_text())
                {
                    Ok(McqOption::new(
                        "free_text",
                        text,
                        Value::String(text.to_string()),
                    ))
                } else {
                    Err(DomainError::UnknownOption(text.to_string()))
                }
            }
        }
    }

    /// Apply a status transition in place.
    pub fn transition(
        &mut self,
        to: McqStatus,
        selected: Option<McqOption>,
    ) -> Result<(), DomainError> {
        self.status = self.status.transition(to)?;
        if selected.is_some() {
            self.selected_option = selected;
        }
        Ok(())
    }
}
