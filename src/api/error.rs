use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{ChatError, DomainError};
use crate::infrastructure::QueueError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// Error returned by every handler, rendered as `{kind, message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidInput(msg) => Self::bad_request(msg),
            ChatError::GenerationFailed(msg) => {
                tracing::error!(kind = "generation_failed", error = %msg, "chat turn failed");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "generation_failed",
                    "the assistant could not produce a response",
                )
            }
            ChatError::Storage(e) => {
                tracing::error!(kind = "storage", error = %e, "chat turn failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage",
                    "conversation could not be saved",
                )
            }
            // Never returned by the chat path; mapped for completeness.
            other => {
                tracing::error!(kind = other.kind(), error = %other, "unexpected chat error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => Self::not_found(msg),
            DomainError::Validation(msg) => Self::bad_request(msg),
            DomainError::ExternalService(msg) => {
                tracing::error!(error = %msg, "upstream failure");
                Self::new(StatusCode::BAD_GATEWAY, "upstream", "an upstream service failed")
            }
            DomainError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
            }
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        tracing::error!(error = %err, "queue failure");
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "queue", "job queue unavailable")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_errors_map_to_documented_statuses() {
        let cases = [
            (ChatError::invalid_input("empty"), StatusCode::BAD_REQUEST, "invalid_input"),
            (ChatError::generation_failed("boom"), StatusCode::BAD_GATEWAY, "generation_failed"),
            (
                ChatError::from(DomainError::internal("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage",
            ),
        ];

        for (err, status, kind) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.kind(), kind);
        }
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let api = ApiError::from(ChatError::from(DomainError::internal("/var/db locked")));
        assert!(!api.message.contains("/var/db"));
    }

    #[test]
    fn test_domain_not_found_is_404() {
        let api = ApiError::from(DomainError::not_found("document 1"));
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
    }
}
