use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use tokenboard_core::{ActivityPoint, LeaderboardEntry, NetworkStats, Principal, savings_score};

use crate::Db;
use crate::buckets::hour_floor;
use crate::error::Result;

fn entry_from_principal(principal: Principal, rank: u64) -> LeaderboardEntry {
    LeaderboardEntry {
        total_tokens: principal.total_tokens(),
        savings_score: savings_score(principal.input_tokens, principal.cache_read_tokens),
        rank,
        id: principal.id,
        handle: principal.handle,
        input_tokens: principal.input_tokens,
        output_tokens: principal.output_tokens,
        cache_read_tokens: principal.cache_read_tokens,
        cache_write_tokens: principal.cache_write_tokens,
        last_active: principal.last_active,
        created_at: principal.created_at,
    }
}

impl Db {
    /// Global rank: 1 + principals with strictly more ranked tokens. O(n)
    /// count, intended for single-principal lookups.
    pub fn rank_of_total(&self, total_tokens: u64) -> Result<u64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM principal WHERE input_tokens + output_tokens > ?1",
                params![total_tokens.min(i64::MAX as u64) as i64],
                |row| row.get::<_, i64>(0),
            )
            .map(|above| above as u64 + 1)
            .map_err(crate::error::DbError::from)
    }

    /// One leaderboard page, ordered by computed total descending. Row rank
    /// is positional (offset + index + 1): ties straddling a page boundary
    /// may disagree with the global count-based rank, a deliberate trade-off
    /// that keeps pagination a single indexed scan.
    pub fn leaderboard_page(&self, page: u64, limit: u64) -> Result<Vec<LeaderboardEntry>> {
        // Page and limit are caller-supplied; saturate so absurd values read
        // past the end of the table instead of overflowing.
        let offset = (page.max(1) - 1)
            .saturating_mul(limit)
            .min(i64::MAX as u64);
        let mut stmt = self.conn.prepare(
            "SELECT id, handle, input_tokens, output_tokens, cache_read_tokens, \
                    cache_write_tokens, last_active, created_at \
             FROM principal \
             ORDER BY input_tokens + output_tokens DESC, id ASC \
             LIMIT ?1 OFFSET ?2",
        )?;
        let mut rows = stmt.query(params![limit.min(i64::MAX as u64) as i64, offset as i64])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let principal = Principal {
                id: row.get(0)?,
                handle: row.get(1)?,
                input_tokens: row.get::<_, i64>(2)? as u64,
                output_tokens: row.get::<_, i64>(3)? as u64,
                cache_read_tokens: row.get::<_, i64>(4)? as u64,
                cache_write_tokens: row.get::<_, i64>(5)? as u64,
                last_active: row.get(6)?,
                created_at: row.get(7)?,
            };
            let rank = offset + entries.len() as u64 + 1;
            entries.push(entry_from_principal(principal, rank));
        }
        Ok(entries)
    }

    /// Leaderboard row shape for one principal, with the global rank.
    pub fn principal_entry(&self, principal: Principal) -> Result<LeaderboardEntry> {
        let rank = self.rank_of_total(principal.total_tokens())?;
        Ok(entry_from_principal(principal, rank))
    }

    /// Aggregate block for the first leaderboard page: 24h volume, 24h
    /// distinct reporters, and the all-time peak hour expressed as
    /// tokens/second.
    pub fn network_stats(&self, now: DateTime<Utc>) -> Result<NetworkStats> {
        let cutoff = hour_floor(now - Duration::hours(24));

        let mut stmt = self.conn.prepare(
            "SELECT hour_bucket, SUM(token_count), COUNT(DISTINCT principal_id) \
             FROM hourly_usage \
             WHERE hour_bucket >= ?1 \
             GROUP BY hour_bucket \
             ORDER BY hour_bucket ASC",
        )?;
        let mut rows = stmt.query(params![cutoff])?;
        let mut graph_data = Vec::new();
        let mut last_24h_tokens = 0u64;
        while let Some(row) = rows.next()? {
            let point = ActivityPoint {
                time: row.get(0)?,
                tokens: row.get::<_, i64>(1)? as u64,
                active_principals: row.get::<_, i64>(2)? as u64,
            };
            last_24h_tokens += point.tokens;
            graph_data.push(point);
        }

        let active_principals_24h: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT principal_id) FROM hourly_usage WHERE hour_bucket >= ?1",
            params![cutoff],
            |row| row.get(0),
        )?;

        // Peak is all-time, not limited to the 24h window.
        let peak_hour_tokens: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(hour_total), 0) FROM (\
               SELECT SUM(token_count) AS hour_total FROM hourly_usage GROUP BY hour_bucket\
             )",
            [],
            |row| row.get(0),
        )?;
        let peak_throughput = (peak_hour_tokens as f64 / 3600.0).round() as u64;

        Ok(NetworkStats {
            peak_throughput,
            last_24h_tokens,
            active_principals_24h: active_principals_24h as u64,
            graph_data,
        })
    }
}
