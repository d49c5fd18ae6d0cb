//! Tool domain module
//!
//! Defines what the agent knows about the remote server's callable
//! operations and which of them mutate state.
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐
//! │ ToolCatalog      │───▶│ ToolDescriptor   │
//! │ (snapshot)       │    │ name, schema     │
//! └──────────────────┘    └────────┬─────────┘
//!                                  │
//!                                  ▼
//!                         WriteVerb::from_tool_name
//!                         (create_*, void_*, send_* ...)
//! ```
//!
//! # Write tools
//!
//! A tool is a **write tool** when its name starts with one of the mutating
//! verbs in [`WriteVerb`]. Only write tools go through validation; read
//! tools always pass.
//!
//! | Verb family | Destructive | Confirmation |
//! |-------------|:-----------:|:------------:|
//! | delete / void / cancel | yes | advisory warning + optional MCQ |
//! | everything else | no | - |

pub mod entities;
pub mod verbs;

pub use entities::{ToolCatalog, ToolDescriptor, ToolParameter};
pub use verbs::{WriteVerb, is_write_tool};
