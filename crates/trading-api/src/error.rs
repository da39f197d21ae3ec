//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use trading_core::error::{SettingsError, StoreError, ValidationError};

/// Errors returned to API callers as `{"error": {"code", "message"}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or empty x-user-id header")]
    Unauthenticated,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("unknown risk profile: {0}")]
    UnknownProfile(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Validation(e) => ApiError::Validation(e),
            SettingsError::UnknownProfile(name) => ApiError::UnknownProfile(name),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::UnknownProfile(_) => (StatusCode::NOT_FOUND, "PROFILE_NOT_FOUND"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let mut body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });
        if let ApiError::Validation(ValidationError::MissingFields(fields)) = &self {
            body["error"]["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}
