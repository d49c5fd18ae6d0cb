//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod catalog;
pub mod mcq_state_machine;
pub mod prereq_chain;
pub mod write_orchestrator;
