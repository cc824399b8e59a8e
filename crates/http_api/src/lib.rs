mod errors;
mod handlers;
mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use state::HttpState;

pub fn router(state: HttpState) -> Router<()> {
    Router::new()
        .route("/api/v1/metrics", post(handlers::ingest_metrics))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .route("/api/user/:handle", get(handlers::user))
        .route("/api/user/:handle/activity", get(handlers::user_activity))
        .with_state(state)
}
