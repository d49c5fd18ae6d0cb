//! Domain layer for toolgate
//!
//! This crate contains the pure rules behind write-safety for a financial
//! agent: what a tool is, which tools mutate state, how arguments are
//! checked, how pre-requisite chains are declared and how a paused write
//! is represented while a human answers a question.
//!
//! It has no dependencies on transports, storage or presentation.
//!
//! # Core Concepts
//!
//! ## Tool Catalog
//!
//! A [`ToolCatalog`] is an immutable snapshot of the tools a remote server
//! exposes. Discovery replaces the snapshot wholesale.
//!
//! ## Two-layer write validation
//!
//! - **Layer 1** ([`FieldValidator`]): argument completeness and generic
//!   invariants, no I/O.
//! - **Layer 2** ([`PreReqConfig`]): declarative chains of read-only tool calls
//!   that gate, enrich or pause a write. The interpreter lives in the
//!   application layer.
//!
//! ## MCQ
//!
//! An [`McqState`] is a persisted multiple-choice question that suspends a
//! write flow until the user answers.

pub mod core;
pub mod mcq;
pub mod prereq;
pub mod tool;
pub mod validation;

// Re-export commonly used types
pub use core::{
    args::{ArgMap, ChainData},
    error::DomainError,
};
pub use mcq::{
    builders::{McqDraft, options_from_records},
    entities::{McqAnswer, McqId, McqOption, McqState, McqStatus, McqType},
    prompt::McqPrompt,
};
pub use prereq::{
    policies::default_prereq_registry,
    result::{ChainOutcome, PreReqChainResult, StepTrace},
    step::{
        FailurePolicy, InjectTarget, PreReqConfig, PreReqRegistry, PreReqStep, StepInput,
        StepVerdict,
    },
};
pub use tool::{
    entities::{ToolCatalog, ToolDescriptor, ToolParameter},
    verbs::{WriteVerb, is_write_tool},
};
pub use validation::{
    field_validator::FieldValidator,
    result::ValidationResult,
    rules::{FieldCheck, ToolRule},
};
