//! In-process record store
//!
//! Same diff and history semantics as the PostgreSQL store, held behind one
//! async mutex. Used for dry runs and tests.

use async_trait::async_trait;
use chrono::Utc;
use spares_common::{AuditEntry, CanonicalRecord, ChangeReason};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{
    changed_fields, history_limit, RecordStore, UpsertOutcome, DEFAULT_ALL_HISTORY_LIMIT,
    DEFAULT_HISTORY_LIMIT,
};
use crate::error::StoreError;

#[derive(Default)]
struct State {
    // BTreeMap keeps codes in ascending order for get_all
    records: BTreeMap<String, CanonicalRecord>,
    history: Vec<AuditEntry>,
    next_history_id: i64,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    state: Mutex<State>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome, StoreError> {
        record.validate()?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let now = Utc::now();

        let outcome = match state.records.get(&record.code) {
            None => UpsertOutcome::Inserted,
            Some(stored) => {
                let changed = changed_fields(stored, record);
                if changed.is_empty() {
                    UpsertOutcome::Unchanged
                } else {
                    let snapshot = CanonicalRecord {
                        synced_at: None,
                        ..stored.clone()
                    };
                    state.next_history_id += 1;
                    let entry = AuditEntry {
                        id: state.next_history_id,
                        snapshot,
                        changed_at: now,
                        reason: ChangeReason::Sync.as_str().to_string(),
                    };
                    state.history.push(entry);
                    UpsertOutcome::Updated { changed }
                }
            },
        };

        state.records.insert(
            record.code.clone(),
            CanonicalRecord {
                synced_at: Some(now),
                ..record.clone()
            },
        );

        Ok(outcome)
    }

    async fn get_all(&self) -> Result<Vec<CanonicalRecord>, StoreError> {
        Ok(self.state.lock().await.records.values().cloned().collect())
    }

    async fn get_history(
        &self,
        code: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let limit = history_limit(limit, DEFAULT_HISTORY_LIMIT) as usize;
        let state = self.state.lock().await;

        Ok(state
            .history
            .iter()
            .rev()
            .filter(|entry| entry.snapshot.code == code)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_all_history(&self, limit: Option<u32>) -> Result<Vec<AuditEntry>, StoreError> {
        let limit = history_limit(limit, DEFAULT_ALL_HISTORY_LIMIT) as usize;
        let state = self.state.lock().await;

        Ok(state.history.iter().rev().take(limit).cloned().collect())
    }
}
