use resilient_http_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed with a retryable error and another is scheduled.
    Retry {
        pattern_name: String,
        timestamp: Instant,
        /// Zero-based index of the retry about to happen.
        attempt: usize,
        delay: Duration,
    },
    /// The call succeeded, possibly after retries.
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every permitted attempt failed.
    Error {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The error was not retryable and was returned as is.
    IgnoredError {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The next delay would cross the elapsed-time budget.
    DeadlineExceeded {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "Retry",
            RetryEvent::Success { .. } => "Success",
            RetryEvent::Error { .. } => "Error",
            RetryEvent::IgnoredError { .. } => "IgnoredError",
            RetryEvent::DeadlineExceeded { .. } => "DeadlineExceeded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. }
            | RetryEvent::DeadlineExceeded { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Retry { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Error { pattern_name, .. }
            | RetryEvent::IgnoredError { pattern_name, .. }
            | RetryEvent::DeadlineExceeded { pattern_name, .. } => pattern_name,
        }
    }
}
