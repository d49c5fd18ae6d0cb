//! MCQ State Machine
//!
//! Persists pending decisions through an [`McqStore`] and moves them to a
//! terminal state:
//!
//! | Operation | Transition | Notes |
//! |-----------|------------|-------|
//! | [`save`](McqStateMachine::save) | - -> pending | cancels any stale pending record first |
//! | [`load_pending`](McqStateMachine::load_pending) | pending -> expired | lazily, when read past `expires_at` |
//! | [`resolve`](McqStateMachine::resolve) | pending -> resolved | records the selected option |
//! | [`cancel`](McqStateMachine::cancel) | pending -> cancelled | explicit cancel |
//! | [`supersede`](McqStateMachine::supersede) | pending -> cancelled | a new unrelated query arrived |
//!
//! Every transition goes through the store's conditional update, so a
//! user's answer racing an auto-cancel resolves to exactly one winner.

use crate::config::McqParams;
use crate::ports::mcq_store::{McqStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use toolgate_domain::{DomainError, McqAnswer, McqId, McqState, McqStatus};
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum McqError {
    #[error("MCQ {0} not found")]
    NotFound(McqId),

    #[error("MCQ {id} belongs to another conversation")]
    ConversationMismatch { id: McqId },

    #[error("MCQ {0} has expired")]
    Expired(McqId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct McqStateMachine {
    store: Arc<dyn McqStore>,
    params: McqParams,
}

impl McqStateMachine {
    pub fn new(store: Arc<dyn McqStore>) -> Self {
        Self {
            store,
            params: McqParams::default(),
        }
    }

    pub fn with_params(mut self, params: McqParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &McqParams {
        &self.params
    }

    /// Persist a new pending question, cancelling any stale one first.
    ///
    /// A record without `expires_at` gets the configured TTL.
    pub async fn save(&self, state: McqState) -> Result<McqState, McqError> {
        let state = match state.expires_at {
            Some(_) => state,
            None => match chrono::Duration::from_std(self.params.ttl) {
                Ok(ttl) => state.with_ttl(ttl),
                Err(_) => state,
            },
        };

        self.supersede(&state.conversation_id).await?;
        match self.store.insert_pending(&state).await {
            Ok(()) => {}
            Err(StoreError::PendingExists { existing, .. }) => {
                // A concurrent turn saved in between; it loses to the newer question.
                warn!(conversation = %state.conversation_id, existing = %existing, "Pending MCQ raced, cancelling");
                self.try_transition(existing, McqStatus::Cancelled).await?;
                self.store.insert_pending(&state).await?;
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            conversation = %state.conversation_id,
            mcq = %state.id,
            mcq_type = %state.mcq_type,
            "MCQ saved"
        );
        Ok(state)
    }

    /// Latest pending question of a conversation, expiring it if stale.
    pub async fn load_pending(&self, conversation_id: &str) -> Result<Option<McqState>, McqError> {
        let Some(state) = self.store.latest_pending(conversation_id).await? else {
            return Ok(None);
        };
        if state.is_expired_at(Utc::now()) {
            debug!(conversation = %conversation_id, mcq = %state.id, "Pending MCQ expired on read");
            self.try_transition(state.id, McqStatus::Expired).await?;
            return Ok(None);
        }
        Ok(Some(state))
    }

    /// Record the user's answer and resolve the question.
    pub async fn resolve(
        &self,
        conversation_id: &str,
        id: McqId,
        answer: &McqAnswer,
    ) -> Result<McqState, McqError> {
        let state = self.pending_in(conversation_id, id).await?;
        let selected = state.interpret(answer)?;
        let resolved = self
            .store
            .transition_if_pending(id, McqStatus::Resolved, Some(selected))
            .await?;
        info!(conversation = %conversation_id, mcq = %id, "MCQ resolved");
        Ok(resolved)
    }

    /// Explicit user cancellation.
    pub async fn cancel(&self, conversation_id: &str, id: McqId) -> Result<McqState, McqError> {
        self.pending_in(conversation_id, id).await?;
        let cancelled = self
            .store
            .transition_if_pending(id, McqStatus::Cancelled, None)
            .await?;
        info!(conversation = %conversation_id, mcq = %id, "MCQ cancelled");
        Ok(cancelled)
    }

    /// Cancel whatever is pending in the conversation. Returns the id of the
    /// cancelled question, if any.
    pub async fn supersede(&self, conversation_id: &str) -> Result<Option<McqId>, McqError> {
        let Some(stale) = self.store.latest_pending(conversation_id).await? else {
            return Ok(None);
        };
        let cancelled = self.try_transition(stale.id, McqStatus::Cancelled).await?;
        if cancelled {
            debug!(conversation = %conversation_id, mcq = %stale.id, "Stale MCQ superseded");
        }
        Ok(cancelled.then_some(stale.id))
    }

    async fn pending_in(&self, conversation_id: &str, id: McqId) -> Result<McqState, McqError> {
        let state = self.store.get(id).await?.ok_or(McqError::NotFound(id))?;
        if state.conversation_id != conversation_id {
            return Err(McqError::ConversationMismatch { id });
        }
        if !state.is_pending() {
            return Err(DomainError::NotPending(id.to_string()).into());
        }
        if state.is_expired_at(Utc::now()) {
            self.try_transition(id, McqStatus::Expired).await?;
            return Err(McqError::Expired(id));
        }
        Ok(state)
    }

    /// Conditional transition that tolerates losing the race.
    async fn try_transition(&self, id: McqId, to: McqStatus) -> Result<bool, McqError> {
        match self.store.transition_if_pending(id, to, None).await {
            Ok(_) => Ok(true),
            Err(StoreError::StatusConflict { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
