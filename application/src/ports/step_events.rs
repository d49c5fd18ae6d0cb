//! Port for per-step observability events.
//!
//! Chain execution reports every step as it happens through a
//! [`StepEventSink`]. Events are not persisted by this core; adapters decide
//! where they go (JSONL file, console, nowhere).
//!
//! `emit` is synchronous and non-fallible. A broken sink must never fail a
//! write.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Lifecycle of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Executing,
    Passed,
    Blocked,
    NeedsInput,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Executing => "executing",
            StepStatus::Passed => "passed",
            StepStatus::Blocked => "blocked",
            StepStatus::NeedsInput => "needs_input",
            StepStatus::Failed => "failed",
        }
    }
}

/// `{tool, status, durationMs, data?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub tool: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl StepEvent {
    pub fn new(tool: impl Into<String>, status: StepStatus) -> Self {
        Self {
            tool: tool.into(),
            status,
            duration_ms: None,
            data: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub trait StepEventSink: Send + Sync {
    fn emit(&self, event: StepEvent);
}

/// No-op sink for tests and when step logging is disabled.
pub struct NoStepEvents;

impl StepEventSink for NoStepEvents {
    fn emit(&self, _event: StepEvent) {}
}

/// Fans each event out to several sinks.
pub struct CompositeStepEvents {
    delegates: Vec<Arc<dyn StepEventSink>>,
}

impl CompositeStepEvents {
    pub fn new(delegates: Vec<Arc<dyn StepEventSink>>) -> Self {
        Self { delegates }
    }
}

impl StepEventSink for CompositeStepEvents {
    fn emit(&self, event: StepEvent) {
        for d in &self.delegates {
            d.emit(event.clone());
        }
    }
}
