//! A single attempt: decorate the request, bound it by the call deadline and
//! turn error statuses into errors the retry and breaker layers can judge.

use crate::context::REQUEST_ID_HEADER;
use crate::request::{OutboundRequest, OutboundResponse};
use crate::transport::TransportError;
use futures::future::BoxFuture;
use http::header::{HeaderName, HeaderValue};
use std::task::{Context, Poll};
use thiserror::Error;
use tower::{Layer, Service};

/// Why one attempt failed.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The upstream answered with a 4xx or 5xx status.
    #[error("upstream responded with status {}", .0.status())]
    Status(OutboundResponse),
}

impl AttemptError {
    /// Transport failures and 5xx statuses are worth another attempt; 4xx
    /// statuses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transport(_) => true,
            AttemptError::Status(response) => response.status().is_server_error(),
        }
    }
}

/// Wraps a transport in [`AttemptService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptLayer;

impl<S> Layer<S> for AttemptLayer {
    type Service = AttemptService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AttemptService { inner }
    }
}

/// Runs one attempt against the transport.
///
/// Sets the correlation header, abandons the attempt at the request's
/// deadline and maps 4xx/5xx responses to [`AttemptError::Status`].
#[derive(Debug, Clone)]
pub struct AttemptService<S> {
    inner: S,
}

impl<S> Service<OutboundRequest> for AttemptService<S>
where
    S: Service<OutboundRequest, Response = OutboundResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = OutboundResponse;
    type Error = AttemptError;
    type Future = BoxFuture<'static, Result<OutboundResponse, AttemptError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AttemptError::Transport)
    }

    fn call(&mut self, mut request: OutboundRequest) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if let Some(id) = request.explicit_request_id().cloned() {
            match HeaderValue::from_str(id.as_str()) {
                Ok(value) => {
                    request
                        .headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }
                Err(_) => tracing::warn!(request_id = %id, "request id is not a valid header value"),
            }
        }

        let target = request.url().to_owned();
        let deadline = request.deadline;

        Box::pin(async move {
            let result = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, inner.call(request))
                    .await
                    .unwrap_or(Err(TransportError::Timeout)),
                None => inner.call(request).await,
            };

            if let Ok(response) = &result {
                tracing::debug!(
                    url = %target,
                    status = response.status().as_u16(),
                    headers = ?response.headers(),
                    "upstream response"
                );
            }

            let result = match result {
                Ok(response)
                    if response.status().is_client_error()
                        || response.status().is_server_error() =>
                {
                    Err(AttemptError::Status(response))
                }
                Ok(response) => Ok(response),
                Err(error) => Err(AttemptError::Transport(error)),
            };

            if let Err(error) = &result {
                tracing::debug!(error = %error, url = %target, "attempt failed");
            }

            result
        })
    }
}
