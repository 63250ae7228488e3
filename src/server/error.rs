//! HTTP error mapping: `AgdError` to status code plus `{error, message}` body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::core::errors::AgdError;

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub AgdError);

impl ApiError {
    /// 400 with a free-form reason.
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self(AgdError::InvalidRequest {
            details: details.into(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AgdError::InvalidRequest { .. }
            | AgdError::InvalidDocument { .. }
            | AgdError::InvalidConfig { .. }
            | AgdError::ConfigParse { .. } => StatusCode::BAD_REQUEST,
            AgdError::Unauthorized => StatusCode::UNAUTHORIZED,
            AgdError::NotFound { .. } => StatusCode::NOT_FOUND,
            AgdError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AgdError> for ApiError {
    fn from(value: AgdError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        } else {
            tracing::debug!(code = self.0.code(), error = %self.0, "request rejected");
        }
        let body = json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
