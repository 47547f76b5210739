//! Error → HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use topicpress_shared::TopicPressError;

/// Error returned by handlers; renders as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<TopicPressError> for ApiError {
    fn from(err: TopicPressError) -> Self {
        let status = match &err {
            TopicPressError::Validation { .. } => StatusCode::BAD_REQUEST,
            TopicPressError::NotFound { .. } | TopicPressError::CorruptRecord { .. } => {
                StatusCode::NOT_FOUND
            }
            TopicPressError::Network(_) => StatusCode::BAD_GATEWAY,
            TopicPressError::Config { .. }
            | TopicPressError::Parse { .. }
            | TopicPressError::Storage(_)
            | TopicPressError::Io { .. }
            | TopicPressError::Generation(_)
            | TopicPressError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %err, "request failed");
        } else {
            warn!(error = %err, "request rejected");
        }

        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
