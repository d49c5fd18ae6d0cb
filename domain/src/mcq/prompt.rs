//! Outbound prompt payload pushed to the calling surface.

use super::entities::{McqId, McqOption, McqState, McqType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{mcqId, mcqType, question, options, pendingTool, context}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqPrompt {
    pub mcq_id: McqId,
    pub mcq_type: McqType,
    pub question: String,
    pub options: Vec<McqOption>,
    pub pending_tool: String,
    pub context: Map<String, Value>,
}

impl From<&McqState> for McqPrompt {
    fn from(state: &McqState) -> Self {
        Self {
            mcq_id: state.id,
            mcq_type: state.mcq_type,
            question: state.question.clone(),
            options: state.options.clone(),
            pending_tool: state.pending_tool.clone(),
            context: state.context.clone(),
        }
    }
}

impl McqPrompt {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::args::ArgMap;
    use crate::mcq::McqDraft;

    #[test]
    fn test_prompt_wire_shape() {
        let state = McqState::new(
            "conv-7",
            McqDraft::write_confirmation("delete_contact", ""),
            "delete_contact",
            ArgMap::new(),
        );
        let json = McqPrompt::from(&state).to_json();

        assert_eq!(json["mcqId"], state.id.to_string());
        assert_eq!(json["mcqType"], "write_confirmation");
        assert_eq!(json["pendingTool"], "delete_contact");
        assert_eq!(json["options"].as_array().unwrap().len(), 2);
        assert!(json.get("context").is_some());
    }
}
