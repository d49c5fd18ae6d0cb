//! MCQ storage port
//!
//! A keyed store for [`McqState`] records scoped by conversation. The store
//! owns the two atomic primitives the state machine relies on:
//!
//! - [`McqStore::insert_pending`] refuses a second pending record for the
//!   same conversation.
//! - [`McqStore::transition_if_pending`] moves a record out of `pending`
//!   only if it is still pending (conditional update, no read-then-write).

use async_trait::async_trait;
use thiserror::Error;
use toolgate_domain::{McqId, McqOption, McqState, McqStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation {conversation_id} already has a pending MCQ ({existing})")]
    PendingExists {
        conversation_id: String,
        existing: McqId,
    },

    /// The conditional update lost: the record is no longer pending.
    #[error("MCQ {id} is already {actual}")]
    StatusConflict { id: McqId, actual: McqStatus },

    #[error("MCQ {0} not found")]
    NotFound(McqId),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait McqStore: Send + Sync {
    /// Insert a new pending record. Fails with
    /// [`StoreError::PendingExists`] if the conversation already has one.
    async fn insert_pending(&self, state: &McqState) -> Result<(), StoreError>;

    async fn get(&self, id: McqId) -> Result<Option<McqState>, StoreError>;

    /// Most recent pending record of a conversation.
    async fn latest_pending(&self, conversation_id: &str) -> Result<Option<McqState>, StoreError>;

    /// Move `id` to `to` if, and only if, it is still pending. Returns the
    /// updated record.
    async fn transition_if_pending(
        &self,
        id: McqId,
        to: McqStatus,
        selected: Option<McqOption>,
    ) -> Result<McqState, StoreError>;
}
