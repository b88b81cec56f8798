use crate::classify::{code_for_status, ErrorCode};
use crate::transport::TransportError;
use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a call failed. Callers get exactly one of these per failed call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The breaker is open; the upstream was not contacted.
    #[error("upstream unavailable: circuit breaker is open")]
    BreakerOpen,
    /// The call ran out of time.
    #[error("upstream call timed out")]
    Timeout(#[source] TransportError),
    /// No response could be obtained from the upstream.
    #[error("network error calling upstream")]
    Network(#[source] TransportError),
    /// The upstream answered with an error status.
    #[error("upstream responded with status {status}")]
    UpstreamStatus { status: StatusCode, body: Bytes },
    /// A response arrived but its body could not be decoded.
    #[error("failed to decode upstream response")]
    Decode(#[source] serde_json::Error),
}

impl ClientError {
    /// The category of this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::BreakerOpen | ClientError::Network(_) => ErrorCode::ServiceUnavailable,
            ClientError::Timeout(_) => ErrorCode::Timeout,
            ClientError::UpstreamStatus { status, .. } => code_for_status(*status),
            ClientError::Decode(_) => ErrorCode::InternalError,
        }
    }

    /// The upstream status, when the failure carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_breaker_open(&self) -> bool {
        matches!(self, ClientError::BreakerOpen)
    }

    /// A serializable summary for API boundaries.
    ///
    /// ```rust
    /// use resilient_http::ClientError;
    ///
    /// let report = ClientError::BreakerOpen.report();
    /// assert_eq!(
    ///     serde_json::to_string(&report).unwrap(),
    ///     r#"{"code":"SERVICE_UNAVAILABLE","message":"upstream unavailable: circuit breaker is open"}"#
    /// );
    /// ```
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            status: self.status().map(|s| s.as_u16()),
        }
    }
}

/// JSON shape of a [`ClientError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("dial_timeout ({dial_timeout:?}) must not exceed timeout ({timeout:?})")]
    DialExceedsTimeout {
        dial_timeout: Duration,
        timeout: Duration,
    },
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },
    #[error("failed to build HTTP transport: {0}")]
    Transport(String),
}
