use serde::{Deserialize, Serialize};

/// Per-report increment extracted from one metrics envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDelta {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

impl TokenDelta {
    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.cache_read_tokens == 0
            && self.cache_write_tokens == 0
    }

    /// The ranking metric: billed API work, cache traffic excluded.
    pub fn ranked_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Everything that moved through the wire, for hourly history.
    pub fn all_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read_tokens)
            .saturating_add(self.cache_write_tokens)
    }
}

/// A registered reporting identity with its durable counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub handle: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub last_active: Option<String>,
    pub created_at: String,
}

impl Principal {
    /// Recomputed from its parts every time; never stored independently.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// One leaderboard row, rank and savings score already computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub handle: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub total_tokens: u64,
    pub savings_score: f64,
    pub rank: u64,
    pub last_active: Option<String>,
    pub created_at: String,
}

/// One (principal, hour) history row. Breakdown fields sum to token_count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour_bucket: String,
    pub token_count: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityPoint {
    pub time: String,
    pub tokens: u64,
    pub active_principals: u64,
}

/// Aggregate block served with page 1 of the leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub peak_throughput: u64,
    pub last_24h_tokens: u64,
    pub active_principals_24h: u64,
    pub graph_data: Vec<ActivityPoint>,
}

/// Fraction of input-shaped demand served from cache, as a percentage.
/// Zero when the principal has no input-shaped traffic at all.
pub fn savings_score(input_tokens: u64, cache_read_tokens: u64) -> f64 {
    let denominator = input_tokens.saturating_add(cache_read_tokens);
    if denominator == 0 {
        return 0.0;
    }
    (cache_read_tokens as f64 / denominator as f64) * 100.0
}

/// Canonical handle form for comparisons: leading `@` stripped, lowercased.
/// Stored handles keep their registered casing.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_ascii_lowercase()
}
