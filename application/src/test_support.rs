//! In-process doubles for use case tests.

use crate::ports::mcq_store::{McqStore, StoreError};
use crate::ports::prompt_sink::PromptSink;
use crate::ports::step_events::{StepEvent, StepEventSink};
use crate::ports::tool_caller::{ToolCallError, ToolCaller};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use toolgate_domain::{ArgMap, McqId, McqOption, McqPrompt, McqState, McqStatus};

/// Returns canned results per tool and records every call.
#[derive(Default)]
pub struct RecordingToolCaller {
    responses: HashMap<String, Result<String, ToolCallError>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, ArgMap)>>,
}

impl RecordingToolCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, tool: &str, result: Value) -> Self {
        self.responses.insert(tool.to_string(), Ok(result.to_string()));
        self
    }

    pub fn with_error(mut self, tool: &str, message: &str) -> Self {
        self.responses.insert(
            tool.to_string(),
            Err(ToolCallError::Remote {
                tool: tool.to_string(),
                message: message.to_string(),
            }),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, ArgMap)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, tool: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == tool)
            .count()
    }
}

#[async_trait]
impl ToolCaller for RecordingToolCaller {
    async fn call(&self, tool: &str, args: &ArgMap) -> Result<String, ToolCallError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), args.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .get(tool)
            .cloned()
            .unwrap_or_else(|| Ok(r#"{"ok": true}"#.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<StepEvent>>,
}

impl RecordingEvents {
    pub fn statuses(&self) -> Vec<(String, &'static str)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.tool.clone(), e.status.as_str()))
            .collect()
    }
}

impl StepEventSink for RecordingEvents {
    fn emit(&self, event: StepEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingPrompts {
    pub prompts: Mutex<Vec<McqPrompt>>,
}

impl PromptSink for RecordingPrompts {
    fn push(&self, prompt: &McqPrompt) {
        self.prompts.lock().unwrap().push(prompt.clone());
    }
}

/// Minimal store honouring the atomic primitives.
#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<Vec<McqState>>,
}

impl MemoryStore {
    pub fn pending_count(&self, conversation_id: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.conversation_id == conversation_id && r.is_pending())
            .count()
    }

    pub fn status_of(&self, id: McqId) -> Option<McqStatus> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }
}

#[async_trait]
impl McqStore for MemoryStore {
    async fn insert_pending(&self, state: &McqState) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .iter()
            .find(|r| r.conversation_id == state.conversation_id && r.is_pending())
        {
            return Err(StoreError::PendingExists {
                conversation_id: state.conversation_id.clone(),
                existing: existing.id,
            });
        }
        records.push(state.clone());
        Ok(())
    }

    async fn get(&self, id: McqId) -> Result<Option<McqState>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn latest_pending(&self, conversation_id: &str) -> Result<Option<McqState>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.conversation_id == conversation_id && r.is_pending())
            .cloned())
    }

    async fn transition_if_pending(
        &self,
        id: McqId,
        to: McqStatus,
        selected: Option<McqOption>,
    ) -> Result<McqState, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if !record.is_pending() {
            return Err(StoreError::StatusConflict {
                id,
                actual: record.status,
            });
        }
        record
            .transition(to, selected)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(record.clone())
    }
}
