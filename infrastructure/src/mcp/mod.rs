//! MCP client: transport negotiation, framing and tool invocation.
//!
//! | Module | Role |
//! |--------|------|
//! | [`negotiator`] | Tries Variant A then Variant B, implements `ToolDiscoveryPort` |
//! | [`streamable`] | Variant A, one POST per message |
//! | [`legacy_sse`] | Variant B, subscription plus POST side channel |
//! | [`sse`] | Event-stream frame decoder with carry-over buffer |
//! | [`protocol`] | JSON-RPC messages and MCP result shapes |
//! | [`http`] | `HttpClient` seam and its reqwest implementation |
//! | [`caller`] | `ToolCaller` over the negotiated connection |

pub mod caller;
pub mod error;
pub mod http;
pub mod legacy_sse;
pub mod negotiator;
pub mod protocol;
pub mod session;
pub mod sse;
pub mod streamable;

#[cfg(test)]
mod fake_server;

pub use caller::McpToolCaller;
pub use error::McpError;
pub use negotiator::{McpConnection, NegotiatorConfig, TransportNegotiator};
pub use session::TransportVariant;
