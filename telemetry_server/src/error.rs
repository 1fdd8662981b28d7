use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use telemetry_core::TelemetryError;
use tracing::error;

/// Maps ingestion errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub TelemetryError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TelemetryError::Validation(_) => StatusCode::BAD_REQUEST,
            TelemetryError::ShapeMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TelemetryError::Forwarding(_) => StatusCode::BAD_GATEWAY,
            TelemetryError::Storage(_)
            | TelemetryError::Csv(_)
            | TelemetryError::Serialization(_)
            | TelemetryError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TelemetryError> for ApiError {
    fn from(err: TelemetryError) -> Self {
        Self(err)
    }
}

/// Malformed or mistyped upload bodies are validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(TelemetryError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
