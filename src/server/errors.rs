//! HTTP error responses
//!
//! Every failure leaves the server as `{"message": ...}`. Server-side
//! failures always carry a fixed message; the underlying detail only goes to
//! the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::namespaces::NamespaceError;

pub const INTERNAL_MESSAGE: &str = "Something went wrong on our side";
pub const TIMEOUT_MESSAGE: &str = "The cluster API did not respond in time";
pub const MALFORMED_BODY_MESSAGE: &str =
    "Request body must be a JSON object with a string 'name' field";
pub const MISSING_NAME_MESSAGE: &str = "Namespace name is required";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Not found";

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}

/// An error on its way to becoming an HTTP response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    /// Attach detail that is logged but never sent to the client
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Map a namespace failure. `conflict_status` is the status used for
    /// "already exists".
    pub fn from_namespace(err: NamespaceError, conflict_status: StatusCode) -> Self {
        match err {
            NamespaceError::Validation(e) => Self::bad_request(e.to_string()),
            NamespaceError::NotFound(_) => Self::not_found(err.to_string()),
            NamespaceError::Conflict(_) => Self::new(conflict_status, err.to_string()),
            NamespaceError::Timeout { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, TIMEOUT_MESSAGE).with_detail(err.to_string())
            }
            NamespaceError::Internal(_) => Self::internal().with_detail(err.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.detail.as_deref().unwrap_or(&self.message);
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "{}", detail);
        } else {
            warn!(status = self.status.as_u16(), "{}", detail);
        }

        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::namespaces::NameError;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                NamespaceError::Validation(NameError::Empty),
                StatusCode::BAD_REQUEST,
            ),
            (
                NamespaceError::NotFound("ghost".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                NamespaceError::Conflict("default".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                NamespaceError::Timeout {
                    operation: "list_pods",
                    timeout: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                NamespaceError::Internal(GatewayError::Other("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(
                ApiError::from_namespace(err, StatusCode::BAD_REQUEST).status(),
                expected
            );
        }
    }

    #[test]
    fn test_conflict_status_is_configurable() {
        let err = ApiError::from_namespace(
            NamespaceError::Conflict("default".into()),
            StatusCode::CONFLICT,
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "Namespace 'default' already exists");
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = ApiError::from_namespace(
            NamespaceError::Internal(GatewayError::Connection("token expired".into())),
            StatusCode::BAD_REQUEST,
        );
        assert_eq!(err.message(), INTERNAL_MESSAGE);
        assert!(!err.message().contains("token"));
    }
}
