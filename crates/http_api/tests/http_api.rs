use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use http_api::HttpState;
use ingest::{DEFAULT_TOKEN_USAGE_METRIC, hash_secret};
use tokenboard_db::Db;

const SECRET: &str = "tb_live_0123456789abcdef";

struct TestApp {
    _temp_dir: tempfile::TempDir,
    router: axum::Router,
}

fn build_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let db_path = temp_dir.path().join("tokenboard.sqlite");
    let mut db = Db::open(&db_path).expect("open db");
    db.migrate().expect("migrate db");
    db.create_principal("agent_a", &hash_secret(SECRET))
        .expect("create principal");

    let state = HttpState::new(db_path, DEFAULT_TOKEN_USAGE_METRIC);
    TestApp {
        _temp_dir: temp_dir,
        router: http_api::router(state),
    }
}

fn envelope(points: &[(&str, u64)]) -> Value {
    let data_points: Vec<Value> = points
        .iter()
        .map(|(token_type, value)| {
            json!({
                "attributes": [{ "key": "type", "value": { "stringValue": token_type } }],
                "asInt": value
            })
        })
        .collect();
    json!({
        "resourceMetrics": [{
            "scopeMetrics": [{
                "metrics": [{
                    "name": DEFAULT_TOKEN_USAGE_METRIC,
                    "sum": { "dataPoints": data_points }
                }]
            }]
        }]
    })
}

fn metrics_request(secret: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/metrics")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {secret}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&body).expect("json body")
}

#[tokio::test]
async fn ingest_then_user_lookup_round_trip() {
    let app = build_app();

    let response = app
        .router
        .clone()
        .oneshot(metrics_request(
            Some(SECRET),
            &envelope(&[("input", 10), ("output", 5), ("cacheRead", 3)]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["processed"], 15);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/user/agent_a")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let user = json_body(response).await;
    assert_eq!(user["handle"], "agent_a");
    assert_eq!(user["input_tokens"], 10);
    assert_eq!(user["output_tokens"], 5);
    assert_eq!(user["cache_read_tokens"], 3);
    assert_eq!(user["total_tokens"], 15);
    assert_eq!(user["rank"], 1);
}

#[tokio::test]
async fn ingest_rejects_bad_and_missing_credentials() {
    let app = build_app();
    let body = envelope(&[("input", 10)]);

    for request in [
        metrics_request(Some("tb_wrong"), &body),
        metrics_request(None, &body),
    ] {
        let response = app.router.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = json_body(response).await;
        assert_eq!(payload["code"], "invalid_credentials");
        assert_eq!(payload["message"], "invalid credentials");
    }

    // Valid secret under someone else's handle: same opaque rejection.
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/metrics")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
        .header("x-principal-handle", "@other_agent")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = json_body(response).await;
    assert_eq!(payload["code"], "invalid_credentials");

    // Nothing was recorded by any rejected call.
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/user/agent_a")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let user = json_body(response).await;
    assert_eq!(user["total_tokens"], 0);
}

#[tokio::test]
async fn zero_token_envelope_reports_nothing_processed() {
    let app = build_app();

    let response = app
        .router
        .oneshot(metrics_request(
            Some(SECRET),
            &envelope(&[("reasoning", 100)]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["processed"], 0);
    assert_eq!(payload["reason"], "no_tokens");
}

#[tokio::test]
async fn duplicate_report_id_is_not_double_counted() {
    let app = build_app();
    let body = envelope(&[("input", 10), ("output", 5)]);

    for expected_reason in [None, Some("duplicate_report")] {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/metrics")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
            .header("x-report-id", "report-001")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app.router.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        match expected_reason {
            None => assert_eq!(payload["processed"], 15),
            Some(reason) => {
                assert_eq!(payload["processed"], 0);
                assert_eq!(payload["reason"], reason);
            }
        }
    }

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/user/agent_a")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let user = json_body(response).await;
    assert_eq!(user["total_tokens"], 15);
}

#[tokio::test]
async fn leaderboard_stats_only_on_first_page() {
    let app = build_app();

    let response = app
        .router
        .clone()
        .oneshot(metrics_request(Some(SECRET), &envelope(&[("input", 100)])))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/leaderboard")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["users"][0]["handle"], "agent_a");
    assert_eq!(payload["users"][0]["rank"], 1);
    assert!(payload["stats"].is_object());
    assert_eq!(payload["stats"]["last_24h_tokens"], 100);
    assert_eq!(payload["stats"]["active_principals_24h"], 1);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/leaderboard?page=2&limit=10")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let payload = json_body(response).await;
    assert!(payload["users"].as_array().expect("users").is_empty());
    assert!(payload.get("stats").is_none());
}

#[tokio::test]
async fn leaderboard_survives_extreme_page_parameter() {
    let app = build_app();

    let uri = format!("/api/leaderboard?page={}&limit=200", u64::MAX);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert!(payload["users"].as_array().expect("users").is_empty());
}

#[tokio::test]
async fn unknown_principal_is_distinct_not_found() {
    let app = build_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/user/nobody")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = json_body(response).await;
    assert_eq!(payload["code"], "unknown_principal");
}

#[tokio::test]
async fn activity_returns_current_hour_bucket() {
    let app = build_app();

    let response = app
        .router
        .clone()
        .oneshot(metrics_request(
            Some(SECRET),
            &envelope(&[("input", 10), ("cacheCreation", 4)]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/user/agent_a/activity")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    let buckets = payload.as_array().expect("buckets");
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["token_count"], 14);
    assert_eq!(buckets[0]["input_tokens"], 10);
    assert_eq!(buckets[0]["cache_write_tokens"], 4);
}
