//! Outbound prompt port.
//!
//! Whenever a write flow pauses on an MCQ, the orchestrator pushes the
//! [`McqPrompt`] to the calling surface. Rendering the question and routing
//! the answer back (`WriteOrchestrator::resume`) is the surface's job.

use toolgate_domain::McqPrompt;

pub trait PromptSink: Send + Sync {
    fn push(&self, prompt: &McqPrompt);
}

/// Discards prompts; callers read them from the returned outcome instead.
pub struct NoPromptSink;

impl PromptSink for NoPromptSink {
    fn push(&self, _prompt: &McqPrompt) {}
}
