use crate::classifier::{DefaultClassifier, FnClassifier};
use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use resilient_http_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a circuit breaker.
///
/// `C` is the failure classifier: [`DefaultClassifier`] unless
/// [`CircuitBreakerConfigBuilder::failure_classifier`] was used.
pub struct CircuitBreakerConfig<C = DefaultClassifier> {
    pub(crate) failure_threshold: u32,
    pub(crate) open_duration: Duration,
    pub(crate) permitted_calls_in_half_open: u32,
    pub(crate) failure_classifier: C,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl<C> CircuitBreakerConfig<C> {
    /// Consecutive failures that trip the breaker.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// How long the breaker stays open before admitting a trial call.
    pub fn open_duration(&self) -> Duration {
        self.open_duration
    }

    /// Number of trial calls admitted while half-open.
    pub fn permitted_calls_in_half_open(&self) -> u32 {
        self.permitted_calls_in_half_open
    }

    /// Instance name used in events, logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CircuitBreakerConfig<DefaultClassifier> {
    /// Starts a builder with default settings.
    pub fn builder() -> CircuitBreakerConfigBuilder<DefaultClassifier> {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for [`CircuitBreaker`].
pub struct CircuitBreakerConfigBuilder<C = DefaultClassifier> {
    failure_threshold: u32,
    open_duration: Duration,
    permitted_calls_in_half_open: u32,
    failure_classifier: C,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder<DefaultClassifier> {
    /// Creates a builder with defaults:
    ///
    /// - failure threshold: 5 consecutive failures
    /// - open duration: 30 seconds
    /// - permitted calls in half-open: 1
    /// - classifier: every `Err` is a failure
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
            failure_classifier: DefaultClassifier,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }
}

impl Default for CircuitBreakerConfigBuilder<DefaultClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CircuitBreakerConfigBuilder<C> {
    /// Sets how many consecutive failures open the circuit.
    ///
    /// Must be at least 1. Default: 5
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Sets how long the circuit stays open before a trial call is admitted.
    ///
    /// Default: 30 seconds
    pub fn open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    /// Sets how many trial calls the half-open state admits. The circuit
    /// closes once that many trials succeed.
    ///
    /// Must be at least 1. Default: 1
    pub fn permitted_calls_in_half_open(mut self, n: u32) -> Self {
        self.permitted_calls_in_half_open = n;
        self
    }

    /// Replaces the failure classifier with a closure.
    ///
    /// The closure's argument type fixes the response and error types the
    /// resulting breaker can guard.
    pub fn failure_classifier<F, Res, Err>(self, f: F) -> CircuitBreakerConfigBuilder<FnClassifier<F>>
    where
        F: Fn(&Result<Res, Err>) -> bool + Send + Sync + 'static,
    {
        self.classifier(FnClassifier::new(f))
    }

    /// Replaces the failure classifier with any [`FailureClassifier`](crate::classifier::FailureClassifier)
    /// implementation, for classifiers that need a nameable type.
    pub fn classifier<C2>(self, classifier: C2) -> CircuitBreakerConfigBuilder<C2> {
        CircuitBreakerConfigBuilder {
            failure_threshold: self.failure_threshold,
            open_duration: self.open_duration,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            failure_classifier: classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Names this breaker for events, logs and metrics.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for state transitions, called with `(from, to)`.
    ///
    /// ```rust
    /// use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let breaker = CircuitBreakerConfig::builder()
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("upstream unhealthy ({:?} -> {:?})", from, to);
    ///         }
    ///     })
    ///     .build();
    /// # let _ = breaker;
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for admitted calls, called with the state that
    /// admitted them.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for rejected calls.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for calls recorded as successes.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for calls recorded as failures, called with the
    /// state at the time and the consecutive-failure count after recording.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded {
                    state,
                    consecutive_failures,
                    ..
                } = event
                {
                    f(*state, *consecutive_failures);
                }
            }));
        self
    }

    /// Builds the breaker.
    ///
    /// # Panics
    ///
    /// Panics if the failure threshold or the half-open permit count is zero.
    pub fn build(self) -> CircuitBreaker<C> {
        assert!(
            self.failure_threshold > 0,
            "failure_threshold must be at least 1"
        );
        assert!(
            self.permitted_calls_in_half_open > 0,
            "permitted_calls_in_half_open must be at least 1"
        );

        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            open_duration: self.open_duration,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            failure_classifier: self.failure_classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
