use crate::attempt::{AttemptError, AttemptLayer, AttemptService};
use crate::classify::classify_failure;
use crate::config::ClientConfig;
use crate::context::current_request_id;
use crate::error::{ClientError, ConfigError};
use crate::request::{OutboundRequest, OutboundResponse};
use crate::transport::{ReqwestTransport, TransportError};
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};
use resilient_http_circuitbreaker::classifier::FailureClassifier;
use resilient_http_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerService};
use resilient_http_retry::{Retry, RetryConfig};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use tokio::time::Instant;
use tower::{Service, ServiceBuilder, ServiceExt};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Counts a finished call against the breaker only when it failed in a way
/// that says something about the upstream's health: transport failures and
/// 5xx statuses. A 4xx answer is a healthy upstream refusing the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamFailure;

impl FailureClassifier<OutboundResponse, AttemptError> for UpstreamFailure {
    fn classify(&self, result: &Result<OutboundResponse, AttemptError>) -> bool {
        matches!(result, Err(error) if error.is_retryable())
    }
}

type Stack<S> = CircuitBreakerService<Retry<AttemptService<S>, AttemptError>, UpstreamFailure>;

/// An HTTP client that retries transient failures and stops calling an
/// upstream that keeps failing.
///
/// Each call goes through, outermost first:
///
/// 1. the circuit breaker, which rejects calls while open and records the
///    final outcome of every admitted call;
/// 2. the retry loop, which re-sends after transport failures and 5xx
///    statuses with a linearly growing delay, within the overall timeout;
/// 3. a single attempt, which sets the correlation header and cancels the
///    transport call at the deadline;
/// 4. the transport.
///
/// Clones share the breaker. Construct one client per upstream and pass it
/// where it is needed.
///
/// ```rust,no_run
/// use resilient_http::{ClientConfig, OutboundRequest, ResilientClient};
///
/// #[derive(serde::Deserialize)]
/// struct Rate { currency: String, value: f64 }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ResilientClient::new(ClientConfig::from_env()?)?;
///
/// let rate: Rate = client
///     .decode_json(OutboundRequest::get("https://rates.example.com/v1/eur"))
///     .await?;
/// println!("{} {}", rate.currency, rate.value);
/// # Ok(())
/// # }
/// ```
pub struct ResilientClient<S = ReqwestTransport> {
    config: Arc<ClientConfig>,
    breaker: CircuitBreaker<UpstreamFailure>,
    stack: Stack<S>,
}

impl ResilientClient<ReqwestTransport> {
    /// Builds a client over a reqwest transport configured from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<S> ResilientClient<S>
where
    S: Service<OutboundRequest, Response = OutboundResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    /// Builds a client over any transport service.
    pub fn with_transport(config: ClientConfig, transport: S) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "http_client_requests_total",
                "Outbound HTTP calls, by method and outcome"
            );
            describe_histogram!(
                "http_client_request_duration_seconds",
                "Outbound HTTP call latency including retries"
            );
        });

        let breaker = CircuitBreakerConfig::builder()
            .name(config.name())
            .failure_threshold(config.failure_threshold())
            .open_duration(config.open_duration())
            .permitted_calls_in_half_open(config.half_open_trials())
            .classifier(UpstreamFailure)
            .build();

        let retry = RetryConfig::<AttemptError>::builder()
            .name(config.name())
            .max_attempts(config.max_attempts())
            .linear_backoff(config.retry_delay())
            .max_elapsed(config.timeout())
            .retry_on(AttemptError::is_retryable)
            .build();

        let stack = ServiceBuilder::new()
            .layer(breaker.layer())
            .layer(retry.layer())
            .layer(AttemptLayer)
            .service(transport);

        Self {
            config: Arc::new(config),
            breaker,
            stack,
        }
    }

    /// Sends `request` and returns the response or one categorized error.
    ///
    /// Responses with a status below 400 are returned as they are. The
    /// correlation id comes from the request or, failing that, from the
    /// current [`with_request_id`](crate::context::with_request_id) scope.
    pub async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, ClientError> {
        let mut request = request;
        request.set_request_id_if_absent(current_request_id());

        let started = Instant::now();
        request.deadline = started.checked_add(self.config.timeout());

        let method = request.method().clone();
        let target = request.url().to_owned();

        let result = self.stack.clone().oneshot(request).await;
        let latency = started.elapsed();

        match result {
            Ok(response) => {
                tracing::info!(
                    client = %self.config.name(),
                    method = %method,
                    url = %target,
                    status = response.status().as_u16(),
                    latency = ?latency,
                    "request completed"
                );

                #[cfg(feature = "metrics")]
                {
                    counter!("http_client_requests_total", "method" => method.to_string(), "outcome" => "success").increment(1);
                    histogram!("http_client_request_duration_seconds", "method" => method.to_string()).record(latency.as_secs_f64());
                }

                Ok(response)
            }
            Err(error) => {
                let error = classify_failure(error);

                tracing::warn!(
                    client = %self.config.name(),
                    method = %method,
                    url = %target,
                    code = %error.code(),
                    error = %error,
                    latency = ?latency,
                    "request failed"
                );

                #[cfg(feature = "metrics")]
                {
                    counter!("http_client_requests_total", "method" => method.to_string(), "outcome" => error.code().as_str()).increment(1);
                    histogram!("http_client_request_duration_seconds", "method" => method.to_string()).record(latency.as_secs_f64());
                }

                Err(error)
            }
        }
    }

    /// Sends `request` and decodes a 2xx JSON body into `T`.
    ///
    /// Non-2xx statuses become [`ClientError::UpstreamStatus`]; a body that
    /// does not decode is [`ClientError::Decode`].
    pub async fn decode_json<T>(&self, request: OutboundRequest) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(request).await?;

        if !response.is_success() {
            return Err(ClientError::UpstreamStatus {
                status: response.status(),
                body: response.into_body(),
            });
        }

        response.json().map_err(ClientError::Decode)
    }
}

impl<S> ResilientClient<S> {
    /// The breaker guarding this client's upstream.
    pub fn breaker(&self) -> &CircuitBreaker<UpstreamFailure> {
        &self.breaker
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<S: Clone> Clone for ResilientClient<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            breaker: self.breaker.clone(),
            stack: self.stack.clone(),
        }
    }
}

impl<S> fmt::Debug for ResilientClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("name", &self.config.name())
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}
