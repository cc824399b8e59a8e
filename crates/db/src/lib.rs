mod buckets;
mod error;
mod leaderboard;
mod migrations;
mod principals;

use std::path::Path;

use rusqlite::Connection;

pub use buckets::hour_floor;
pub use error::{DbError, Result};
pub use principals::AppliedResult;

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }
}
