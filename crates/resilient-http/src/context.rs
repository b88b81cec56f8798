//! Correlation id propagation.
//!
//! A caller scopes a [`RequestId`] over a future with [`with_request_id`];
//! every request the client sends from inside that future carries the id in
//! the [`REQUEST_ID_HEADER`] header, on every attempt.

use std::fmt;
use std::future::Future;

/// Outbound header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: RequestId;
}

/// A correlation id forwarded to the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Runs `future` with `id` as the current request id.
///
/// ```rust
/// use resilient_http::context::{current_request_id, with_request_id};
///
/// # async fn example() {
/// let seen = with_request_id("req-42", async { current_request_id() }).await;
/// assert_eq!(seen.unwrap().as_str(), "req-42");
/// assert!(current_request_id().is_none());
/// # }
/// ```
pub async fn with_request_id<F>(id: impl Into<RequestId>, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(id.into(), future).await
}

/// The request id scoped over the current task, if any.
pub fn current_request_id() -> Option<RequestId> {
    REQUEST_ID.try_with(RequestId::clone).ok()
}
