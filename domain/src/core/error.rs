//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid MCQ transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown MCQ option: {0}")]
    UnknownOption(String),

    #[error("MCQ {0} is not awaiting an answer")]
    NotPending(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl DomainError {
    /// Check if this error represents a state-machine violation
    pub fn is_transition_error(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidTransition { .. } | DomainError::NotPending(_)
        )
    }
}
