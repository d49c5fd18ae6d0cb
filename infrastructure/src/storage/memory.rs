//! In-process [`McqStore`].
//!
//! All records live in one map behind a mutex. Both atomic primitives run
//! entirely under the lock, so concurrent turns in a conversation cannot
//! produce two pending records or two winners of a transition.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use toolgate_application::{McqStore, StoreError};
use toolgate_domain::{McqId, McqOption, McqState, McqStatus};
use tracing::trace;

#[derive(Debug, Default)]
pub struct InMemoryMcqStore {
    records: Mutex<HashMap<McqId, McqState>>,
}

impl InMemoryMcqStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<McqId, McqState>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every record of a conversation, oldest first.
    pub fn history(&self, conversation_id: &str) -> Vec<McqState> {
        let mut records: Vec<McqState> = self
            .records()
            .values()
            .filter(|r| r.conversation_id == conversation_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

fn latest_pending_in<'a>(
    records: &'a HashMap<McqId, McqState>,
    conversation_id: &str,
) -> Option<&'a McqState> {
    records
        .values()
        .filter(|r| r.conversation_id == conversation_id && r.is_pending())
        .max_by_key(|r| (r.created_at, r.id))
}

#[async_trait]
impl McqStore for InMemoryMcqStore {
    async fn insert_pending(&self, state: &McqState) -> Result<(), StoreError> {
        let mut records = self.records();
        if let Some(existing) = latest_pending_in(&records, &state.conversation_id) {
            return Err(StoreError::PendingExists {
                conversation_id: state.conversation_id.clone(),
                existing: existing.id,
            });
        }
        trace!(mcq = %state.id, "MCQ inserted");
        records.insert(state.id, state.clone());
        Ok(())
    }

    async fn get(&self, id: McqId) -> Result<Option<McqState>, StoreError> {
        Ok(self.records().get(&id).cloned())
    }

    async fn latest_pending(&self, conversation_id: &str) -> Result<Option<McqState>, StoreError> {
        Ok(latest_pending_in(&self.records(), conversation_id).cloned())
    }

    async fn transition_if_pending(
        &self,
        id: McqId,
        to: McqStatus,
        selected: Option<McqOption>,
    ) -> Result<McqState, StoreError> {
        let mut records = self.records();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !record.is_pending() {
            return Err(StoreError::StatusConflict {
                id,
                actual: record.status,
            });
        }
        record
            .transition(to, selected)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use toolgate_domain::{ArgMap, McqDraft};

    fn confirmation(conversation: &str) -> McqState {
        McqState::new(
            conversation,
            McqDraft::write_confirmation("void_invoice", ""),
            "void_invoice",
            ArgMap::new(),
        )
    }

    #[tokio::test]
    async fn test_second_pending_rejected() {
        let store = InMemoryMcqStore::new();
        let first = confirmation("c1");
        store.insert_pending(&first).await.unwrap();

        let err = store.insert_pending(&confirmation("c1")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::PendingExists {
                conversation_id: "c1".into(),
                existing: first.id
            }
        );
        store.insert_pending(&confirmation("c2")).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_transition_only_from_pending() {
        let store = InMemoryMcqStore::new();
        let mcq = confirmation("c1");
        store.insert_pending(&mcq).await.unwrap();

        let done = store
            .transition_if_pending(mcq.id, McqStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(done.status, McqStatus::Cancelled);
        assert!(store.latest_pending("c1").await.unwrap().is_none());

        let err = store
            .transition_if_pending(mcq.id, McqStatus::Resolved, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::StatusConflict {
                id: mcq.id,
                actual: McqStatus::Cancelled
            }
        );
        assert_eq!(store.history("c1").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_transitions_have_one_winner() {
        let store = Arc::new(InMemoryMcqStore::new());
        let mcq = confirmation("c1");
        store.insert_pending(&mcq).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let to = if i % 2 == 0 {
                    McqStatus::Resolved
                } else {
                    McqStatus::Cancelled
                };
                tokio::spawn(async move { store.transition_if_pending(mcq.id, to, None).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
