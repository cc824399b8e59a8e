use chrono::{DateTime, Utc};
use serde_json::Value;
use tokenboard_db::{AppliedResult, Db};

use crate::auth;
use crate::extract::extract_token_delta;
use crate::types::{ReportOutcome, Result};

/// Request-level inputs accompanying a metrics envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportHeaders<'a> {
    pub secret: Option<&'a str>,
    pub claimed_handle: Option<&'a str>,
    /// Client-supplied idempotency key; retried deliveries carrying the
    /// same key are deduplicated instead of double counted.
    pub report_key: Option<&'a str>,
}

/// One ingestion call: verify the principal, reduce the envelope to a
/// delta, apply it. Authentication failures surface before anything is
/// parsed into storage; extraction never hard-fails, it degrades to a
/// zero delta.
pub fn process_report(
    db: &mut Db,
    headers: ReportHeaders<'_>,
    envelope: &Value,
    metric_name: &str,
    now: DateTime<Utc>,
) -> Result<ReportOutcome> {
    let principal = auth::verify(db, headers.secret, headers.claimed_handle)?;
    let delta = extract_token_delta(envelope, metric_name);
    match db.apply_delta(principal.id, &delta, now, headers.report_key)? {
        AppliedResult::Applied { processed } => {
            tracing::debug!(principal_id = principal.id, processed, "report applied");
            Ok(ReportOutcome::applied(processed))
        }
        AppliedResult::NothingProcessed => Ok(ReportOutcome::nothing("no_tokens")),
        AppliedResult::Duplicate => {
            tracing::debug!(principal_id = principal.id, "duplicate report dropped");
            Ok(ReportOutcome::nothing("duplicate_report"))
        }
    }
}
