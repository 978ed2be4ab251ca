use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::error::LifecycleError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    /// Conversion failures are reported to the client with their detail
    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::TooLarge { .. } => AppError::PayloadTooLarge(message),
            LifecycleError::NotFound => AppError::NotFound(message),
            LifecycleError::NoFilesConverted => AppError::BadRequest(message),
            LifecycleError::ConversionTool { .. } | LifecycleError::Conversion(_) => {
                AppError::Conversion(message)
            }
            ref e if e.is_validation() => AppError::BadRequest(message),
            _ => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Conversion(msg) => {
                tracing::error!("Conversion error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: LifecycleError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_lifecycle_error_mapping() {
        assert_eq!(
            status_of(LifecycleError::InvalidType("Only PDF files allowed".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(LifecycleError::NoFile), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LifecycleError::NoFilesProvided), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(LifecycleError::NoFilesConverted), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(LifecycleError::TooLarge { limit: 1024 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(status_of(LifecycleError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(LifecycleError::ConversionTool {
                status: Some(1),
                detail: "boom".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(LifecycleError::Storage(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_kept() {
        match AppError::from(LifecycleError::InvalidType("Invalid conversion type".into())) {
            AppError::BadRequest(msg) => assert_eq!(msg, "Invalid conversion type"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
