//! The HTTP transport: one request, one response, no retries.

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::request::{OutboundRequest, OutboundResponse};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use thiserror::Error;
use tower::Service;

/// A failure below the HTTP layer: no response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt ran past its deadline or the transport's own timeout.
    #[error("request timed out")]
    Timeout,
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other failure while sending the request or reading the response.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// Sends requests with a [`reqwest::Client`].
///
/// The client is built with `connect_timeout` set to the configured dial
/// timeout and `timeout` set to the overall timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wraps an existing client as is.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(client: reqwest::Client, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let response = client
            .request(request.method().clone(), request.url())
            .headers(request.headers().clone())
            .body(request.body_bytes().clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(OutboundResponse::new(status, body).with_headers(headers))
    }
}

impl Service<OutboundRequest> for ReqwestTransport {
    type Response = OutboundResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<OutboundResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: OutboundRequest) -> Self::Future {
        Box::pin(Self::send(self.client.clone(), request))
    }
}
