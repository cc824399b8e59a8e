use std::path::PathBuf;

use tokenboard_db::Db;

/// Each request opens its own connection; WAL mode plus single-statement
/// increments keep writers from serializing behind an application lock.
#[derive(Clone)]
pub struct HttpState {
    pub db_path: PathBuf,
    pub metric_name: String,
}

impl HttpState {
    pub fn new(db_path: PathBuf, metric_name: impl Into<String>) -> Self {
        Self {
            db_path,
            metric_name: metric_name.into(),
        }
    }

    pub fn open_db(&self) -> tokenboard_db::Result<Db> {
        Db::open(&self.db_path)
    }
}
