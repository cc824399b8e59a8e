use serde::Serialize;

/// Authentication failures. All variants collapse to one opaque rejection
/// at the HTTP boundary so callers cannot enumerate which handles exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingCredential,
    UnknownPrincipal,
    HandleMismatch,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing credential"),
            Self::UnknownPrincipal => write!(f, "unknown principal"),
            Self::HandleMismatch => write!(f, "handle mismatch"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors emitted while processing one inbound report.
#[derive(Debug)]
pub enum IngestError {
    Auth(AuthError),
    Db(tokenboard_db::DbError),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(err) => write!(f, "auth error: {}", err),
            Self::Db(err) => write!(f, "db error: {}", err),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<AuthError> for IngestError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<tokenboard_db::DbError> for IngestError {
    fn from(err: tokenboard_db::DbError) -> Self {
        Self::Db(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Summary returned to the reporting client after one ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub success: bool,
    /// Ranked (input + output) tokens accepted by this call.
    pub processed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReportOutcome {
    pub fn applied(processed: u64) -> Self {
        Self {
            success: true,
            processed,
            reason: None,
        }
    }

    pub fn nothing(reason: &str) -> Self {
        Self {
            success: true,
            processed: 0,
            reason: Some(reason.to_string()),
        }
    }
}
