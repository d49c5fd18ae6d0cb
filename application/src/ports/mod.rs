//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.
//!
//! | Port | Adapter |
//! |------|---------|
//! | [`ToolCaller`](tool_caller::ToolCaller) | `McpToolCaller` |
//! | [`ToolDiscoveryPort`](tool_discovery::ToolDiscoveryPort) | `TransportNegotiator` |
//! | [`McqStore`](mcq_store::McqStore) | `InMemoryMcqStore` |
//! | [`StepEventSink`](step_events::StepEventSink) | `JsonlStepLogger`, `ConsoleStepReporter` |
//! | [`PromptSink`](prompt_sink::PromptSink) | `ConsolePromptSink` |

pub mod mcq_store;
pub mod prompt_sink;
pub mod step_events;
pub mod tool_caller;
pub mod tool_discovery;
