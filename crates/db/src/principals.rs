use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use tokenboard_core::{Principal, TokenDelta, normalize_handle};

use crate::Db;
use crate::error::Result;

/// Outcome of applying one report's delta to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedResult {
    /// Totals updated; `processed` counts the ranked (input + output) tokens.
    Applied { processed: u64 },
    /// All-zero delta; storage untouched.
    NothingProcessed,
    /// Report key already recorded for this principal; storage untouched.
    Duplicate,
}

/// Receipts older than this are pruned; retries outside the window are
/// accepted as new deliveries (documented at-least-once fallback).
const RECEIPT_WINDOW_HOURS: i64 = 24;

fn row_to_principal(row: &Row<'_>) -> rusqlite::Result<Principal> {
    Ok(Principal {
        id: row.get(0)?,
        handle: row.get(1)?,
        input_tokens: row.get::<_, i64>(2)? as u64,
        output_tokens: row.get::<_, i64>(3)? as u64,
        cache_read_tokens: row.get::<_, i64>(4)? as u64,
        cache_write_tokens: row.get::<_, i64>(5)? as u64,
        last_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const PRINCIPAL_COLUMNS: &str = "id, handle, input_tokens, output_tokens, \
     cache_read_tokens, cache_write_tokens, last_active, created_at";

impl Db {
    /// Registers a principal with zero counters. Credential issuance lives
    /// outside the collector; only the hash of the secret ever lands here.
    pub fn create_principal(&self, handle: &str, secret_hash: &str) -> Result<Principal> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.conn.execute(
            "INSERT INTO principal (handle, secret_hash, created_at) VALUES (?1, ?2, ?3)",
            params![handle, secret_hash, created_at],
        )?;
        Ok(Principal {
            id: self.conn.last_insert_rowid(),
            handle: handle.to_string(),
            input_tokens: 0,
            output_tokens: 0,
            cache_read_tokens: 0,
            cache_write_tokens: 0,
            last_active: None,
            created_at,
        })
    }

    pub fn find_principal_by_secret_hash(&self, secret_hash: &str) -> Result<Option<Principal>> {
        self.conn
            .query_row(
                &format!("SELECT {PRINCIPAL_COLUMNS} FROM principal WHERE secret_hash = ?1"),
                params![secret_hash],
                row_to_principal,
            )
            .optional()
            .map_err(crate::error::DbError::from)
    }

    pub fn find_principal_by_handle(&self, handle: &str) -> Result<Option<Principal>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {PRINCIPAL_COLUMNS} FROM principal \
                     WHERE lower(ltrim(handle, '@')) = ?1"
                ),
                params![normalize_handle(handle)],
                row_to_principal,
            )
            .optional()
            .map_err(crate::error::DbError::from)
    }

    /// Applies one report's delta: running totals atomically, then the
    /// hourly bucket as best effort. The totals increment is a single
    /// add-in-place UPDATE, never an application-level read-modify-write,
    /// so concurrent reports for the same principal cannot lose updates.
    pub fn apply_delta(
        &mut self,
        principal_id: i64,
        delta: &TokenDelta,
        now: DateTime<Utc>,
        report_key: Option<&str>,
    ) -> Result<AppliedResult> {
        if delta.is_zero() {
            return Ok(AppliedResult::NothingProcessed);
        }
        let now_str = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        // Immediate: take the write lock up front so concurrent writers
        // queue behind the busy timeout instead of failing mid-upgrade.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(key) = report_key {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO ingest_receipt (principal_id, report_key, received_at) \
                 VALUES (?1, ?2, ?3)",
                params![principal_id, key, now_str],
            )?;
            if inserted == 0 {
                // Dropping the transaction rolls back; nothing was written.
                return Ok(AppliedResult::Duplicate);
            }
            let cutoff = (now - Duration::hours(RECEIPT_WINDOW_HOURS))
                .to_rfc3339_opts(SecondsFormat::Millis, true);
            tx.execute(
                "DELETE FROM ingest_receipt WHERE received_at < ?1",
                params![cutoff],
            )?;
        }
        tx.execute(
            "UPDATE principal SET \
               input_tokens = input_tokens + ?1, \
               output_tokens = output_tokens + ?2, \
               cache_read_tokens = cache_read_tokens + ?3, \
               cache_write_tokens = cache_write_tokens + ?4, \
               last_active = ?5 \
             WHERE id = ?6",
            params![
                delta.input_tokens as i64,
                delta.output_tokens as i64,
                delta.cache_read_tokens as i64,
                delta.cache_write_tokens as i64,
                now_str,
                principal_id,
            ],
        )?;
        tx.commit()?;

        // Totals are authoritative for ranking; history only feeds charts.
        // A failed bucket write must never undo the committed totals.
        if let Err(err) = self.upsert_hour_bucket(principal_id, delta, now) {
            tracing::warn!(principal_id, error = %err, "hourly bucket update failed");
        }
        Ok(AppliedResult::Applied {
            processed: delta.ranked_tokens(),
        })
    }
}
