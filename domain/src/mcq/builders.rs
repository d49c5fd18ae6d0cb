//! Builders for the canonical question shapes.

use super::entities::{McqOption, McqType};
use crate::core::args;
use serde_json::{Map, Value};

/// A question not yet tied to a conversation or a paused write.
///
/// [`McqState::new`](super::McqState::new) turns a draft into a persisted
/// record.
#[derive(Debug, Clone, PartialEq)]
pub struct McqDraft {
    pub mcq_type: McqType,
    pub question: String,
    pub options: Vec<McqOption>,
    pub context: Map<String, Value>,
    pub missing_field: Option<String>,
    pub entity_id: Option<String>,
}

impl McqDraft {
    fn new(mcq_type: McqType, question: impl Into<String>, options: Vec<McqOption>) -> Self {
        Self {
            mcq_type,
            question: question.into(),
            options,
            context: Map::new(),
            missing_field: None,
            entity_id: None,
        }
    }

    /// Pick one of several candidate records (fuzzy-match results, accounts).
    pub fn entity_resolution(
        question: impl Into<String>,
        candidates: Vec<McqOption>,
        missing_field: Option<&str>,
    ) -> Self {
        let mut draft = Self::new(McqType::EntityResolution, question, candidates);
        draft.missing_field = missing_field.map(str::to_string);
        draft
    }

    /// Yes/No confirmation before a write is invoked.
    pub fn write_confirmation(tool: &str, summary: &str) -> Self {
        let question = if summary.is_empty() {
            format!("Are you sure you want to run {tool}?")
        } else {
            format!("{summary}\n\nAre you sure you want to run {tool}?")
        };
        Self::new(
            McqType::WriteConfirmation,
            question,
            vec![
                McqOption::new("yes", "Yes", Value::Bool(true)),
                McqOption::new("no", "No", Value::Bool(false)),
            ],
        )
        .with_context("tool", Value::String(tool.to_string()))
    }

    /// Fill in a parameter from a list of options (free text accepted).
    pub fn parameter_resolution(
        question: impl Into<String>,
        options: Vec<McqOption>,
        missing_field: Option<&str>,
    ) -> Self {
        let mut draft = Self::new(McqType::ParameterResolution, question, options);
        draft.missing_field = missing_field.map(str::to_string);
        draft
    }

    pub fn disambiguation(question: impl Into<String>, options: Vec<McqOption>) -> Self {
        Self::new(McqType::Disambiguation, question, options)
    }

    /// One open question replacing a further chained prompt.
    ///
    /// Lists what is still unresolved and asks for it in a single free-text
    /// answer.
    pub fn consolidated(tool: &str, pending_question: &str, missing_field: Option<&str>) -> Self {
        let mut question = format!(
            "I still need more details before I can run {tool}. {pending_question}"
        );
        if let Some(field) = missing_field {
            question.push_str(&format!(" Please reply with the {field} to use."));
        }
        let mut draft = Self::new(McqType::ParameterResolution, question, Vec::new())
            .with_context("consolidated", Value::Bool(true));
        draft.missing_field = missing_field.map(str::to_string);
        draft
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Turn candidate records into options, capped at `limit`.
///
/// `id_path` selects the value substituted when chosen; the first present
/// `label_paths` entry becomes the label; `detail_paths` are joined into the
/// description. Records without an id are skipped.
pub fn options_from_records<'a>(
    records: impl IntoIterator<Item = &'a Value>,
    id_path: &str,
    label_paths: &[&str],
    detail_paths: &[&str],
    limit: usize,
) -> Vec<McqOption> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = args::text_at(record, id_path)?;
            let label = label_paths
                .iter()
                .find_map(|path| args::text_at(record, path))
                .unwrap_or_else(|| id.clone());
            let details: Vec<String> = detail_paths
                .iter()
                .filter_map(|path| args::text_at(record, path))
                .collect();
            let option = McqOption::new(id.clone(), label, Value::String(id));
            Some(if details.is_empty() {
                option
            } else {
                option.with_description(details.join(", "))
            })
        })
        .take(limit)
        .collect()
}
