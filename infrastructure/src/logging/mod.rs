//! Logging infrastructure: structured step-event logging.
//!
//! Provides [`JsonlStepLogger`], a JSONL file writer that implements the
//! [`StepEventSink`](toolgate_application::StepEventSink) port.

mod jsonl_step_logger;

pub use jsonl_step_logger::JsonlStepLogger;
