//! Change-tracked record storage
//!
//! A [`RecordStore`] keeps the current state of every spare keyed by code
//! and an append-only history of the states it replaced. An upsert writes a
//! history snapshot of the *previous* state exactly when one of the tracked
//! fields changed, and always refreshes the record's `synced_at`.

pub mod diff;
pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use spares_common::{AuditEntry, CanonicalRecord};

use crate::error::StoreError;

pub use diff::{changed_fields, TrackedField, TRACKED_FIELDS};
pub use memory::MemoryRecordStore;
pub use pool::{create_pool, health_check, DbConfig};
pub use postgres::PgRecordStore;

// ============================================================================
// History Query Constants
// ============================================================================

/// Default number of history entries returned for a single code.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Default number of history entries returned across all codes.
pub const DEFAULT_ALL_HISTORY_LIMIT: u32 = 500;

/// Upper bound on any history query, to avoid unbounded result sets.
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// Clamp a caller-supplied history limit
pub fn history_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).min(MAX_HISTORY_LIMIT)
}

/// What an upsert did to the stored state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The code was not stored before
    Inserted,
    /// Tracked fields changed; the previous state went to history
    Updated { changed: Vec<TrackedField> },
    /// Nothing tracked changed; only `synced_at` was refreshed
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Updated { .. } => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

/// Persistent store of canonical records and their history
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or update a record, recording the prior state when it changed.
    ///
    /// The read, diff and write happen in one critical section per code.
    async fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome, StoreError>;

    /// All stored records ordered by code ascending
    async fn get_all(&self) -> Result<Vec<CanonicalRecord>, StoreError>;

    /// History of one code, most recent first
    async fn get_history(
        &self,
        code: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditEntry>, StoreError>;

    /// History of every code, most recent first
    async fn get_all_history(&self, limit: Option<u32>) -> Result<Vec<AuditEntry>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit() {
        assert_eq!(history_limit(None, DEFAULT_HISTORY_LIMIT), 100);
        assert_eq!(history_limit(Some(5), DEFAULT_HISTORY_LIMIT), 5);
        assert_eq!(history_limit(Some(50_000), DEFAULT_ALL_HISTORY_LIMIT), 1000);
    }
}
