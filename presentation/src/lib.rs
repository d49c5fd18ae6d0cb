//! Presentation layer for toolgate
//!
//! This crate contains CLI definitions, output formatters,
//! the step progress reporter and interactive MCQ answering.

pub mod cli;
pub mod output;
pub mod progress;
pub mod prompt;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat, ServerArgs};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::ConsoleStepReporter;
pub use prompt::{AnswerReader, ConsolePromptSink, UserReply};
