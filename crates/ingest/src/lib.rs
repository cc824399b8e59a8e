mod auth;
mod extract;
mod report;
mod types;

pub use auth::{hash_secret, verify};
pub use extract::{DEFAULT_TOKEN_USAGE_METRIC, extract_token_delta};
pub use report::{ReportHeaders, process_report};
pub use types::{AuthError, IngestError, ReportOutcome, Result};
