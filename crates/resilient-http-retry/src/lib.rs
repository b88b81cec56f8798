//! Retry middleware for Tower services.
//!
//! Runs one logical call up to `max_attempts` times, sleeping between
//! attempts according to a pluggable [`IntervalFunction`]. Retryability is
//! explicit: only errors accepted by the configured predicate are retried,
//! everything else is returned after the first attempt.
//!
//! # Features
//!
//! - Linear (default), exponential, fixed and closure-based backoff
//! - Explicit retry predicates via [`RetryConfigBuilder::retry_on`]
//! - Elapsed-time budget spanning all attempts and delays
//! - Events for every retry decision
//!
//! # Example
//!
//! ```
//! use resilient_http_retry::RetryConfig;
//! use std::time::Duration;
//!
//! # #[derive(Debug)]
//! # struct Unavailable;
//! # async fn example() {
//! let retry = RetryConfig::<Unavailable>::builder()
//!     .max_attempts(3)
//!     .linear_backoff(Duration::from_millis(100))
//!     .retry_all()
//!     .on_retry(|retry, delay| println!("retry #{} in {:?}", retry + 1, delay))
//!     .build();
//!
//! let answer = retry.attempt(|| async { Ok::<_, Unavailable>(42) }).await;
//! assert_eq!(answer.unwrap(), 42);
//! # }
//! ```

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

pub use backoff::{ExponentialBackoff, FixedInterval, FnInterval, IntervalFunction, LinearBackoff};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};

use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

impl<E> RetryConfig<E> {
    /// Runs `f` until it succeeds, returns a non-retryable error, runs out of
    /// attempts or would exceed the elapsed-time budget.
    ///
    /// `f` is called once per attempt. The last error is returned when the
    /// loop gives up.
    pub async fn attempt<F, Fut, T>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = tokio::time::Instant::now();
        let mut attempt = 0;

        loop {
            let error = match f().await {
                Ok(response) => {
                    self.event_listeners.emit(&RetryEvent::Success {
                        pattern_name: self.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "success").increment(1);

                    return Ok(response);
                }
                Err(error) => error,
            };

            if !self.policy.should_retry(&error) {
                #[cfg(feature = "tracing")]
                tracing::debug!(retry = %self.name, attempts = attempt + 1, "error is not retryable");

                self.event_listeners.emit(&RetryEvent::IgnoredError {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt + 1,
                });

                #[cfg(feature = "metrics")]
                counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "ignored").increment(1);

                return Err(error);
            }

            if attempt + 1 >= self.policy.max_attempts {
                #[cfg(feature = "tracing")]
                tracing::debug!(retry = %self.name, attempts = attempt + 1, "retry attempts exhausted");

                self.event_listeners.emit(&RetryEvent::Error {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt + 1,
                });

                #[cfg(feature = "metrics")]
                counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "exhausted").increment(1);

                return Err(error);
            }

            let delay = self.policy.next_backoff(attempt);

            if let Some(budget) = self.max_elapsed {
                if started.elapsed().saturating_add(delay) >= budget {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(retry = %self.name, attempts = attempt + 1, ?delay, "retry would exceed the elapsed-time budget");

                    self.event_listeners.emit(&RetryEvent::DeadlineExceeded {
                        pattern_name: self.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "deadline").increment(1);

                    return Err(error);
                }
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(retry = %self.name, retry_index = attempt, ?delay, "scheduling retry");

            self.event_listeners.emit(&RetryEvent::Retry {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                attempt,
                delay,
            });

            #[cfg(feature = "metrics")]
            counter!("retry_attempts_total", "retry" => self.name.clone()).increment(1);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// A Tower [`Service`] that retries failed requests.
///
/// Requests must be `Clone`; each attempt gets its own copy and its own
/// clone of the inner service.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    /// Wraps `inner` with the given configuration.
    pub fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        Self { inner, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &RetryConfig<E> {
        &self.config
    }
}

impl<S, E> Clone for Retry<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Each attempt drives readiness on its own clone of the inner service.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            config
                .attempt(move || {
                    let service = service.clone();
                    let req = req.clone();
                    async move { service.oneshot(req).await }
                })
                .await
        })
    }
}
