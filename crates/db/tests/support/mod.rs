#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokenboard_core::{Principal, TokenDelta};
use tokenboard_db::Db;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn register(db: &Db, handle: &str) -> Principal {
    db.create_principal(handle, &format!("hash-{handle}"))
        .expect("create principal")
}

pub fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("timestamp")
}

pub fn delta(input: u64, output: u64, cache_read: u64, cache_write: u64) -> TokenDelta {
    TokenDelta {
        input_tokens: input,
        output_tokens: output,
        cache_read_tokens: cache_read,
        cache_write_tokens: cache_write,
    }
}

pub fn apply(db: &mut Db, principal_id: i64, delta: &TokenDelta, at: &str) {
    db.apply_delta(principal_id, delta, ts(at), None)
        .expect("apply delta");
}
