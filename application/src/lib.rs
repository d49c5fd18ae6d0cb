//! Application layer for toolgate
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{McqParams, WriteSafetyParams};
pub use ports::{
    mcq_store::{McqStore, StoreError},
    prompt_sink::{NoPromptSink, PromptSink},
    step_events::{CompositeStepEvents, NoStepEvents, StepEvent, StepEventSink, StepStatus},
    tool_caller::{ToolCallError, ToolCaller},
    tool_discovery::{Credentials, DiscoveryError, ToolDiscoveryPort},
};
pub use use_cases::catalog::{CatalogError, CatalogStore, RefreshCatalogUseCase};
pub use use_cases::mcq_state_machine::{McqError, McqStateMachine};
pub use use_cases::prereq_chain::{ChainError, PreReqChainExecutor};
pub use use_cases::write_orchestrator::{OrchestratorError, WriteOrchestrator, WriteOutcome};
