use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use http_api::HttpState;
use ingest::DEFAULT_TOKEN_USAGE_METRIC;
use tokenboard_db::Db;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn setup_db(path: &Path) -> tokenboard_db::Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let db_path = PathBuf::from(env_or("TOKENBOARD_DB", "tokenboard.sqlite"));
    let addr = env_or("TOKENBOARD_ADDR", "127.0.0.1:8787");
    let metric_name = env_or("TOKENBOARD_METRIC", DEFAULT_TOKEN_USAGE_METRIC);

    if let Err(err) = setup_db(&db_path) {
        eprintln!("failed to initialize database: {}", err);
        std::process::exit(1);
    }

    let state = HttpState::new(db_path, metric_name);
    let app = http_api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("bind server");
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await.expect("serve");
}
