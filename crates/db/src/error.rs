/// Storage-layer failures. Timestamps are written pre-formatted and read
/// back as text, so sqlite is the only fallible boundary here.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;
