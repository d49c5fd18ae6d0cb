//! MCQ domain module
//!
//! An MCQ is a persisted multiple-choice question that suspends a write flow
//! until the human operator answers. The record carries everything needed to
//! resume: the tool that was paused, its arguments, and which argument the
//! answer fills in.
//!
//! # Lifecycle
//!
//! ```text
//!               resolve
//!          ┌──────────────▶ Resolved
//!          │
//!  Pending ├──────────────▶ Cancelled   (user cancel / superseded)
//!          │    cancel
//!          │
//!          └──────────────▶ Expired     (read past expires_at)
//!               expire
//! ```
//!
//! Every transition leaves `Pending`; the other three states are terminal.
//! At most one `Pending` record exists per conversation.
//!
//! # Question shapes
//!
//! | [`McqType`] | Built by | Options |
//! |-------------|----------|---------|
//! | `entity_resolution` | [`McqDraft::entity_resolution`] | candidate records |
//! | `write_confirmation` | [`McqDraft::write_confirmation`] | Yes / No |
//! | `parameter_resolution` | [`McqDraft::parameter_resolution`] | arbitrary, free text allowed |
//! | `disambiguation` | [`McqDraft::disambiguation`] | arbitrary |

pub mod builders;
pub mod entities;
pub mod prompt;

pub use builders::{McqDraft, options_from_records};
pub use entities::{McqAnswer, McqId, McqOption, McqState, McqStatus, McqType};
pub use prompt::McqPrompt;
