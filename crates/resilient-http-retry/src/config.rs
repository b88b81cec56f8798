use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction, LinearBackoff};
use crate::events::RetryEvent;
use crate::layer::RetryLayer;
use crate::policy::{RetryPolicy, RetryPredicate};
use resilient_http_core::{EventListeners, FnListener};
#[cfg(feature = "metrics")]
use metrics::describe_counter;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::time::Duration;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Configuration for the retry middleware.
pub struct RetryConfig<E> {
    pub(crate) policy: RetryPolicy<E>,
    pub(crate) max_elapsed: Option<Duration>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    /// Starts a builder with default settings.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// Wraps this configuration in a Tower layer.
    pub fn layer(self) -> RetryLayer<E> {
        RetryLayer::new(self)
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    predicate: Option<RetryPredicate<E>>,
    max_elapsed: Option<Duration>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a builder.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: linear, 100ms step
    /// - predicate: none, so no error is retried until [`retry_on`](Self::retry_on)
    ///   or [`retry_all`](Self::retry_all) is called
    /// - max_elapsed: unbounded
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            interval_fn: None,
            predicate: None,
            max_elapsed: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the total number of attempts, including the first.
    ///
    /// `max_attempts(3)` means one attempt plus at most two retries. Values
    /// below 1 are treated as 1.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Waits `base * n` before the n-th retry.
    pub fn linear_backoff(mut self, base: Duration) -> Self {
        self.interval_fn = Some(Arc::new(LinearBackoff::new(base)));
        self
    }

    /// Waits `initial * 2^(n-1)` before the n-th retry.
    pub fn exponential_backoff(mut self, initial: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial)));
        self
    }

    /// Waits `interval` before every retry.
    pub fn fixed_backoff(mut self, interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(interval)));
        self
    }

    /// Uses a custom delay strategy.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Retries only errors for which `predicate` returns `true`.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Retries every error.
    pub fn retry_all(self) -> Self {
        self.retry_on(|_| true)
    }

    /// Bounds the whole call, attempts and delays together.
    ///
    /// A retry whose delay would end past the budget is not scheduled; the
    /// last error is returned instead.
    pub fn max_elapsed(mut self, budget: Duration) -> Self {
        self.max_elapsed = Some(budget);
        self
    }

    /// Names this instance for events, logs and metrics.
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback run before each retry with the zero-based retry
    /// index and the delay about to be slept.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Registers a callback for successful calls with the number of attempts
    /// made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Success { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback for calls that used up every attempt.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Error { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback for errors the predicate refused to retry.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::IgnoredError { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback for calls cut short by the elapsed-time budget.
    pub fn on_deadline_exceeded<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::DeadlineExceeded { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RetryConfig<E> {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!("retry_calls_total", "Retried calls, by final outcome");
            describe_counter!("retry_attempts_total", "Retries scheduled after a failed attempt");
        });

        let interval_fn = self
            .interval_fn
            .unwrap_or_else(|| Arc::new(LinearBackoff::new(Duration::from_millis(100))));

        RetryConfig {
            policy: RetryPolicy {
                max_attempts: self.max_attempts,
                interval_fn,
                predicate: self.predicate,
            },
            max_elapsed: self.max_elapsed,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
