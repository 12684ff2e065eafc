// HTTP error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert request body rejections to HTTP errors
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Expected request with `Content-Type: application/json`",
            ),
            other => AppError::bad_request(other.body_text()),
        }
    }
}

/// Convert cluster errors to HTTP errors
impl From<opsdeck_cluster::Error> for AppError {
    fn from(err: opsdeck_cluster::Error) -> Self {
        use opsdeck_cluster::Error;

        match err {
            Error::NodeNotFound(name) => AppError::not_found(format!("Node not found: {name}")),
            Error::DuplicateNode(name) => {
                AppError::conflict(format!("Node already registered: {name}"))
            }
            Error::ClusterNotReady => {
                AppError::service_unavailable("No healthy nodes available")
            }
            Error::Persistence(e) => {
                tracing::error!("Persistence error: {}", e);
                AppError::internal_server_error("Failed to persist node state")
            }
            Error::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                AppError::internal_server_error("Internal server error")
            }
        }
    }
}

/// Convert core errors (validation) to HTTP errors
impl From<opsdeck_core::Error> for AppError {
    fn from(err: opsdeck_core::Error) -> Self {
        use opsdeck_core::Error;

        match err {
            Error::InvalidInput(msg) => AppError::bad_request(msg),
            Error::NotFound(msg) => AppError::not_found(msg),
            Error::AlreadyExists(msg) => AppError::conflict(msg),
            other => {
                tracing::error!("Internal error: {}", other);
                AppError::internal_server_error("Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_error_mapping() {
        use opsdeck_cluster::Error;

        assert_eq!(
            AppError::from(Error::NodeNotFound("n1".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(Error::DuplicateNode("n1".into())).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(Error::ClusterNotReady).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        let persistence = AppError::from(Error::Persistence(opsdeck_core::Error::Internal(
            "disk full".into(),
        )));
        assert_eq!(persistence.status, StatusCode::INTERNAL_SERVER_ERROR);
        // Internal details are not leaked
        assert!(!persistence.message.contains("disk full"));
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let err = AppError::from(opsdeck_core::Error::InvalidInput("port".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
