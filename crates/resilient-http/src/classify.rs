//! Mapping call outcomes to error categories.

use crate::attempt::AttemptError;
use crate::error::ClientError;
use crate::transport::TransportError;
use http::StatusCode;
use resilient_http_circuitbreaker::CircuitBreakerError;
use serde::Serialize;
use std::fmt;

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    InternalError,
    NotImplemented,
    ServiceUnavailable,
    Timeout,
}

impl ErrorCode {
    /// The wire form, e.g. `NOT_FOUND`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }

    /// A short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "Invalid input provided",
            ErrorCode::Unauthenticated => "Authentication required",
            ErrorCode::PermissionDenied => "Insufficient permissions",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::NotImplemented => "Feature not implemented",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Request timeout",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category for an upstream status.
///
/// Statuses without a dedicated category are internal errors.
pub fn code_for_status(status: StatusCode) -> ErrorCode {
    match status.as_u16() {
        400 | 413 | 422 => ErrorCode::InvalidArgument,
        401 => ErrorCode::Unauthenticated,
        403 => ErrorCode::PermissionDenied,
        404 => ErrorCode::NotFound,
        405 => ErrorCode::NotImplemented,
        408 | 504 => ErrorCode::Timeout,
        409 => ErrorCode::AlreadyExists,
        429 | 503 => ErrorCode::ServiceUnavailable,
        _ => ErrorCode::InternalError,
    }
}

/// Turns the failure that came out of the breaker/retry stack into a
/// [`ClientError`].
pub fn classify_failure(error: CircuitBreakerError<AttemptError>) -> ClientError {
    match error {
        CircuitBreakerError::OpenCircuit => ClientError::BreakerOpen,
        CircuitBreakerError::Inner(AttemptError::Status(response)) => ClientError::UpstreamStatus {
            status: response.status(),
            body: response.into_body(),
        },
        CircuitBreakerError::Inner(AttemptError::Transport(TransportError::Timeout)) => {
            ClientError::Timeout(TransportError::Timeout)
        }
        CircuitBreakerError::Inner(AttemptError::Transport(error)) => ClientError::Network(error),
    }
}
