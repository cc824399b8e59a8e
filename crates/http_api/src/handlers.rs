use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ingest::{IngestError, ReportHeaders, process_report};
use tokenboard_core::{LeaderboardEntry, NetworkStats};
use tokenboard_db::hour_floor;

use crate::{errors::HttpError, state::HttpState};

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

fn bearer_secret(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(|value| value.to_string())
}

pub async fn ingest_metrics(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(envelope): Json<Value>,
) -> Result<impl IntoResponse, HttpError> {
    let secret = bearer_secret(&headers);
    let claimed_handle = header_string(&headers, "x-principal-handle");
    let report_key = header_string(&headers, "x-report-id");

    let outcome = tokio::task::spawn_blocking(move || {
        let mut db = state.open_db().map_err(IngestError::Db)?;
        process_report(
            &mut db,
            ReportHeaders {
                secret: secret.as_deref(),
                claimed_handle: claimed_handle.as_deref(),
                report_key: report_key.as_deref(),
            },
            &envelope,
            &state.metric_name,
            Utc::now(),
        )
    })
    .await
    .map_err(|err| HttpError::internal(err.to_string()))??;

    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    users: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<NetworkStats>,
}

pub async fn leaderboard(
    State(state): State<HttpState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let response = run_query(move || {
        let db = state.open_db()?;
        let users = db.leaderboard_page(page, limit)?;
        // The aggregate block is only assembled for the first page.
        let stats = if page == 1 {
            Some(db.network_stats(Utc::now())?)
        } else {
            None
        };
        Ok(LeaderboardResponse { users, stats })
    })
    .await?;
    Ok(Json(response))
}

pub async fn user(
    State(state): State<HttpState>,
    Path(handle): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let entry = run_query(move || {
        let db = state.open_db()?;
        let principal = db
            .find_principal_by_handle(&handle)?
            .ok_or_else(unknown_principal)?;
        Ok(db.principal_entry(principal)?)
    })
    .await?;
    Ok(Json(entry))
}

pub async fn user_activity(
    State(state): State<HttpState>,
    Path(handle): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let buckets = run_query(move || {
        let db = state.open_db()?;
        let principal = db
            .find_principal_by_handle(&handle)?
            .ok_or_else(unknown_principal)?;
        let since = hour_floor(Utc::now() - Duration::hours(24));
        Ok(db.buckets_for_principal_since(principal.id, &since)?)
    })
    .await?;
    Ok(Json(buckets))
}

/// Read queries hit sqlite synchronously; keep them off the async runtime
/// the same way the ingest path does.
async fn run_query<T, F>(query: F) -> Result<T, HttpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, HttpError> + Send + 'static,
{
    tokio::task::spawn_blocking(query)
        .await
        .map_err(|err| HttpError::internal(err.to_string()))?
}

fn unknown_principal() -> HttpError {
    HttpError::new(
        StatusCode::NOT_FOUND,
        "unknown principal",
        Some("unknown_principal".to_string()),
    )
}
