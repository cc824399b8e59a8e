use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    body: ApiError,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: Option<String>) -> Self {
        let body = ApiError {
            status: status.as_u16(),
            message: message.into(),
            code,
        };
        Self { status, body }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, None)
    }
}

impl From<tokenboard_db::DbError> for HttpError {
    fn from(err: tokenboard_db::DbError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<ingest::IngestError> for HttpError {
    fn from(err: ingest::IngestError) -> Self {
        match err {
            // One opaque rejection for every auth failure; the body never
            // reveals whether the handle exists or the secret was wrong.
            ingest::IngestError::Auth(reason) => {
                tracing::warn!(%reason, "rejected report");
                Self::new(
                    StatusCode::UNAUTHORIZED,
                    "invalid credentials",
                    Some("invalid_credentials".to_string()),
                )
            }
            ingest::IngestError::Db(err) => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
