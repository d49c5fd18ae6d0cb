//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: MCP transports, the in-memory MCQ store,
//! the JSONL step log and configuration file loading.

pub mod config;
pub mod logging;
pub mod mcp;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileDiscoveryConfig, FileLoggingConfig,
    FileMcqConfig, FileWriteSafetyConfig,
};
pub use logging::JsonlStepLogger;
pub use mcp::{
    McpConnection, McpError, McpToolCaller, NegotiatorConfig, TransportNegotiator,
    TransportVariant,
};
pub use storage::InMemoryMcqStore;
