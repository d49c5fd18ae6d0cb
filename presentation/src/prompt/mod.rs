//! Interactive MCQ answering
//!
//! [`ConsolePromptSink`] renders each question the orchestrator raises;
//! [`AnswerReader`] turns the next input line into an [`McqAnswer`] or a
//! cancellation.
//!
//! [`McqAnswer`]: toolgate_domain::McqAnswer

mod console;

pub use console::{AnswerReader, ConsolePromptSink, UserReply};
