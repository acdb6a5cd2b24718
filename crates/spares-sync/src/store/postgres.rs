//! PostgreSQL-backed record store
//!
//! Uses the `spares` and `spares_history` tables from the workspace
//! migrations. Extra fields live in a `JSON` (not `JSONB`) column so the
//! upstream key order survives a round trip; they are read back as text and
//! decoded here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use spares_common::{AuditEntry, CanonicalRecord, ChangeReason, ExtraFields};
use tracing::debug;

use super::{
    changed_fields, history_limit, RecordStore, UpsertOutcome, DEFAULT_ALL_HISTORY_LIMIT,
    DEFAULT_HISTORY_LIMIT,
};
use crate::error::StoreError;

/// Row of the `spares` table
#[derive(Debug, sqlx::FromRow)]
struct SpareRow {
    spare_code: String,
    spare_name: String,
    spare_description: Option<String>,
    spare_type: Option<String>,
    spare_status: Option<String>,
    price: Option<String>,
    quantity: Option<i32>,
    updated_at: Option<String>,
    additional_fields: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
}

impl SpareRow {
    fn into_record(self) -> Result<CanonicalRecord, StoreError> {
        Ok(CanonicalRecord {
            extra: decode_extra(self.additional_fields.as_deref())?,
            code: self.spare_code,
            name: self.spare_name,
            description: self.spare_description,
            spare_type: self.spare_type,
            status: self.spare_status,
            price: self.price,
            quantity: self.quantity,
            updated_at: self.updated_at,
            synced_at: self.last_synced_at,
        })
    }
}

/// Row of the `spares_history` table
#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    spare_code: String,
    spare_name: Option<String>,
    spare_description: Option<String>,
    spare_type: Option<String>,
    spare_status: Option<String>,
    price: Option<String>,
    quantity: Option<i32>,
    updated_at: Option<String>,
    additional_fields: Option<String>,
    changed_at: DateTime<Utc>,
    change_reason: String,
}

impl HistoryRow {
    fn into_entry(self) -> Result<AuditEntry, StoreError> {
        Ok(AuditEntry {
            id: self.id,
            snapshot: CanonicalRecord {
                extra: decode_extra(self.additional_fields.as_deref())?,
                code: self.spare_code,
                name: self.spare_name.unwrap_or_default(),
                description: self.spare_description,
                spare_type: self.spare_type,
                status: self.spare_status,
                price: self.price,
                quantity: self.quantity,
                updated_at: self.updated_at,
                synced_at: None,
            },
            changed_at: self.changed_at,
            reason: self.change_reason,
        })
    }
}

fn decode_extra(text: Option<&str>) -> Result<Option<ExtraFields>, StoreError> {
    match text {
        None => Ok(None),
        Some(text) => {
            let fields: ExtraFields = serde_json::from_str(text)?;
            Ok(if fields.is_empty() { None } else { Some(fields) })
        },
    }
}

fn encode_extra(extra: Option<&ExtraFields>) -> Result<String, StoreError> {
    match extra {
        Some(fields) => Ok(serde_json::to_string(fields)?),
        None => Ok("{}".to_string()),
    }
}

const SELECT_HISTORY: &str = r#"
    SELECT
        id, spare_code, spare_name, spare_description, spare_type,
        spare_status, price, quantity, updated_at,
        additional_fields::text AS additional_fields,
        changed_at, change_reason
    FROM spares_history
"#;

/// Record store over a shared connection pool
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_code(tx: &mut Transaction<'_, Postgres>, code: &str) -> Result<(), StoreError> {
        // Held until commit or rollback; also covers codes with no row yet
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(code)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        previous: &CanonicalRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO spares_history (
                spare_code, spare_name, spare_description, spare_type,
                spare_status, price, quantity, updated_at, additional_fields, change_reason,
                changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::json, $10, clock_timestamp())
            "#,
        )
        .bind(&previous.code)
        .bind(&previous.name)
        .bind(&previous.description)
        .bind(&previous.spare_type)
        .bind(&previous.status)
        .bind(&previous.price)
        .bind(previous.quantity)
        .bind(&previous.updated_at)
        .bind(encode_extra(previous.extra.as_ref())?)
        .bind(ChangeReason::Sync.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome, StoreError> {
        record.validate()?;
        let extra = encode_extra(record.extra.as_ref())?;

        let mut tx = self.pool.begin().await?;
        Self::lock_code(&mut tx, &record.code).await?;

        let existing = sqlx::query_as::<_, SpareRow>(
            r#"
            SELECT
                spare_code, spare_name, spare_description, spare_type, spare_status,
                price, quantity, updated_at,
                additional_fields::text AS additional_fields,
                last_synced_at
            FROM spares
            WHERE spare_code = $1
            FOR UPDATE
            "#,
        )
        .bind(&record.code)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            None => UpsertOutcome::Inserted,
            Some(row) => {
                let stored = row.into_record()?;
                let changed = changed_fields(&stored, record);
                if changed.is_empty() {
                    UpsertOutcome::Unchanged
                } else {
                    Self::insert_history(&mut tx, &stored).await?;
                    UpsertOutcome::Updated { changed }
                }
            },
        };

        sqlx::query(
            r#"
            INSERT INTO spares (
                spare_code, spare_name, spare_description, spare_type,
                spare_status, price, quantity, updated_at, additional_fields, last_synced_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::json, NOW())
            ON CONFLICT (spare_code) DO UPDATE SET
                spare_name = EXCLUDED.spare_name,
                spare_description = EXCLUDED.spare_description,
                spare_type = EXCLUDED.spare_type,
                spare_status = EXCLUDED.spare_status,
                price = EXCLUDED.price,
                quantity = EXCLUDED.quantity,
                updated_at = EXCLUDED.updated_at,
                additional_fields = EXCLUDED.additional_fields,
                last_synced_at = NOW()
            "#,
        )
        .bind(&record.code)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.spare_type)
        .bind(&record.status)
        .bind(&record.price)
        .bind(record.quantity)
        .bind(&record.updated_at)
        .bind(extra)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(code = %record.code, outcome = outcome.as_str(), "Upserted spare");

        Ok(outcome)
    }

    async fn get_all(&self) -> Result<Vec<CanonicalRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SpareRow>(
            r#"
            SELECT
                spare_code, spare_name, spare_description, spare_type, spare_status,
                price, quantity, updated_at,
                additional_fields::text AS additional_fields,
                last_synced_at
            FROM spares
            ORDER BY spare_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded spares");

        rows.into_iter().map(SpareRow::into_record).collect()
    }

    async fn get_history(
        &self,
        code: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let limit = history_limit(limit, DEFAULT_HISTORY_LIMIT);
        // id, not changed_at: ids are drawn under the per-code lock
        let sql = format!(
            "{} WHERE spare_code = $1 ORDER BY id DESC LIMIT $2",
            SELECT_HISTORY
        );

        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(code)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        debug!(code = %code, count = rows.len(), "Retrieved spare history");

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    async fn get_all_history(&self, limit: Option<u32>) -> Result<Vec<AuditEntry>, StoreError> {
        let limit = history_limit(limit, DEFAULT_ALL_HISTORY_LIMIT);
        let sql = format!("{} ORDER BY id DESC LIMIT $1", SELECT_HISTORY);

        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Retrieved history");

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_extra_keeps_order_and_empties_to_none() {
        let fields = decode_extra(Some(r#"{"zone":"B4","bin":3}"#)).unwrap().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["zone", "bin"]);

        assert!(decode_extra(Some("{}")).unwrap().is_none());
        assert!(decode_extra(None).unwrap().is_none());
        assert!(decode_extra(Some("not json")).is_err());
    }

    #[test]
    fn test_encode_extra() {
        assert_eq!(encode_extra(None).unwrap(), "{}");

        let mut fields = ExtraFields::new();
        fields.insert("zone".to_string(), "B4".into());
        assert_eq!(encode_extra(Some(&fields)).unwrap(), r#"{"zone":"B4"}"#);
    }
}
