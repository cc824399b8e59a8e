use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use rusqlite::params;
use tokenboard_core::{HourlyBucket, TokenDelta};

use crate::Db;
use crate::error::Result;

/// Current hour boundary in the collector's clock, RFC 3339 with second
/// precision so bucket keys compare lexicographically.
pub fn hour_floor(now: DateTime<Utc>) -> String {
    now.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Db {
    /// Merge-add upsert: one row per (principal, hour), concurrent reports
    /// within the same hour accumulate into it. The whole field group moves
    /// in a single statement, so a bucket is never partially applied.
    pub(crate) fn upsert_hour_bucket(
        &self,
        principal_id: i64,
        delta: &TokenDelta,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let hour_bucket = hour_floor(now);
        self.conn.execute(
            "INSERT INTO hourly_usage (\
               principal_id, hour_bucket, token_count, input_tokens, output_tokens, \
               cache_read_tokens, cache_write_tokens\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT (principal_id, hour_bucket) DO UPDATE SET \
               token_count = token_count + excluded.token_count, \
               input_tokens = input_tokens + excluded.input_tokens, \
               output_tokens = output_tokens + excluded.output_tokens, \
               cache_read_tokens = cache_read_tokens + excluded.cache_read_tokens, \
               cache_write_tokens = cache_write_tokens + excluded.cache_write_tokens",
            params![
                principal_id,
                hour_bucket,
                delta.all_tokens() as i64,
                delta.input_tokens as i64,
                delta.output_tokens as i64,
                delta.cache_read_tokens as i64,
                delta.cache_write_tokens as i64,
            ],
        )?;
        Ok(())
    }

    /// Hourly history for one principal since the given hour key, ascending.
    pub fn buckets_for_principal_since(
        &self,
        principal_id: i64,
        since_hour: &str,
    ) -> Result<Vec<HourlyBucket>> {
        let mut stmt = self.conn.prepare(
            "SELECT hour_bucket, token_count, input_tokens, output_tokens, \
                    cache_read_tokens, cache_write_tokens \
             FROM hourly_usage \
             WHERE principal_id = ?1 AND hour_bucket >= ?2 \
             ORDER BY hour_bucket ASC",
        )?;
        let mut rows = stmt.query(params![principal_id, since_hour])?;
        let mut buckets = Vec::new();
        while let Some(row) = rows.next()? {
            buckets.push(HourlyBucket {
                hour_bucket: row.get(0)?,
                token_count: row.get::<_, i64>(1)? as u64,
                input_tokens: row.get::<_, i64>(2)? as u64,
                output_tokens: row.get::<_, i64>(3)? as u64,
                cache_read_tokens: row.get::<_, i64>(4)? as u64,
                cache_write_tokens: row.get::<_, i64>(5)? as u64,
            });
        }
        Ok(buckets)
    }
}
