//! Resilient outbound HTTP client.
//!
//! [`ResilientClient`] wraps a single upstream with:
//!
//! - a consecutive-failure circuit breaker that fails fast with
//!   [`ClientError::BreakerOpen`] while the upstream is unhealthy;
//! - bounded retries with linear backoff for transport failures and 5xx
//!   statuses, never for 4xx;
//! - an overall timeout covering every attempt;
//! - correlation id forwarding through the [`REQUEST_ID_HEADER`] header;
//! - one categorized [`ClientError`] per failed call, with a stable
//!   [`ErrorCode`].
//!
//! ```rust,no_run
//! use resilient_http::context::with_request_id;
//! use resilient_http::{ClientConfig, OutboundRequest, ResilientClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::builder()
//!     .name("inventory")
//!     .timeout(Duration::from_secs(10))
//!     .max_retries(2)
//!     .failure_threshold(5)
//!     .build()?;
//! let client = ResilientClient::new(config)?;
//!
//! let response = with_request_id(
//!     "req-7f3a",
//!     client.send(OutboundRequest::get("https://inventory.internal/items/42")),
//! )
//! .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: client, breaker and retry metrics via the `metrics` crate

mod attempt;
pub mod classify;
mod client;
pub mod config;
pub mod context;
mod error;
mod request;
mod transport;

pub use attempt::{AttemptError, AttemptLayer, AttemptService};
pub use classify::{classify_failure, code_for_status, ErrorCode};
pub use client::{ResilientClient, UpstreamFailure};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use context::{current_request_id, with_request_id, RequestId, REQUEST_ID_HEADER};
pub use error::{ClientError, ConfigError, ErrorReport};
pub use request::{OutboundRequest, OutboundResponse};
pub use transport::{ReqwestTransport, TransportError};

pub use resilient_http_circuitbreaker::{CircuitMetrics, CircuitState};
