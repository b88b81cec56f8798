//! Consecutive-failure circuit breaker.
//!
//! A circuit breaker stops calling a dependency that keeps failing, giving it
//! time to recover and sparing callers the latency of doomed calls.
//!
//! ## States
//! - **Closed**: calls pass through. Each failed call increments a
//!   consecutive-failure counter and any success resets it. Reaching the
//!   threshold opens the circuit.
//! - **Open**: calls are rejected with [`CircuitBreakerError::OpenCircuit`]
//!   without running. After the open duration the next call is admitted as a
//!   trial.
//! - **Half-open**: up to `permitted_calls_in_half_open` trials run; the rest
//!   are rejected. Enough successful trials close the circuit, a single failed
//!   trial reopens it and restarts the open timer.
//!
//! ## Guarding a call
//!
//! ```rust
//! use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreakerConfig::builder()
//!     .name("billing-api")
//!     .failure_threshold(3)
//!     .open_duration(Duration::from_secs(60))
//!     .build();
//!
//! let result = breaker
//!     .execute(|| async { Ok::<_, std::io::Error>("pong") })
//!     .await;
//!
//! assert!(result.is_ok());
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # }
//! ```
//!
//! ## As Tower middleware
//!
//! ```rust
//! use resilient_http_circuitbreaker::CircuitBreakerConfig;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let breaker = CircuitBreakerConfig::builder().failure_threshold(5).build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(breaker.layer())
//!     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
//! # let _ = service;
//! ```
//!
//! Every service produced by the same breaker's layer shares one state.
//!
//! ## Feature Flags
//! - `tracing`: log state transitions (`warn`) and admission decisions (`trace`)
//! - `metrics`: call, transition and state metrics via the `metrics` crate
//! - `serde`: `Serialize` for [`CircuitState`] and [`CircuitMetrics`]

use crate::circuit::Circuit;
use crate::classifier::FailureClassifier;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;

pub use circuit::{CircuitMetrics, CircuitState};
pub use classifier::{DefaultClassifier, FnClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};

mod circuit;
pub mod classifier;
mod config;
mod error;
mod events;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A shared circuit breaker.
///
/// Clones share the same state, so one breaker can guard calls made from many
/// tasks. State changes happen under a single mutex that is never held while
/// a guarded call runs; calls in the closed state proceed concurrently.
pub struct CircuitBreaker<C = DefaultClassifier> {
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig<C>>,
}

impl<C> CircuitBreaker<C> {
    pub(crate) fn new(config: CircuitBreakerConfig<C>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "circuitbreaker_calls_total",
                "Calls seen by the circuit breaker, by outcome"
            );
            describe_counter!(
                "circuitbreaker_transitions_total",
                "Circuit breaker state transitions"
            );
            describe_gauge!(
                "circuitbreaker_state",
                "Current circuit state (0 closed, 1 open, 2 half-open)"
            );
        });

        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            circuit: Arc::new(Mutex::new(Circuit::new(Arc::clone(&state_atomic)))),
            state_atomic,
            config: Arc::new(config),
        }
    }

    /// Runs `f` if the breaker admits it and records the outcome.
    ///
    /// Returns [`CircuitBreakerError::OpenCircuit`] without calling `f` when
    /// the call is rejected. If the returned future is dropped before `f`
    /// finishes, nothing is recorded and a half-open trial slot is handed
    /// back.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FailureClassifier<T, E>,
    {
        let permit = self.try_acquire().ok_or(CircuitBreakerError::OpenCircuit)?;

        let result = f().await;

        permit.complete(self.config.failure_classifier.classify(&result));
        result.map_err(CircuitBreakerError::Inner)
    }

    fn try_acquire(&self) -> Option<CallPermit<C>> {
        let generation = update(&self.circuit, &self.config, |c, cfg| c.try_acquire(cfg));

        #[cfg(feature = "tracing")]
        {
            let name = &self.config.name;
            if generation.is_some() {
                tracing::trace!(breaker = %name, "circuit breaker permitted call");
            } else {
                tracing::trace!(breaker = %name, "circuit breaker rejected call");
            }
        }

        generation.map(|generation| CallPermit {
            circuit: Arc::clone(&self.circuit),
            config: Arc::clone(&self.config),
            generation,
            completed: false,
        })
    }

    /// Returns the current state without taking the lock.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns `true` while the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns a consistent snapshot of the breaker's counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics()
    }

    /// Opens the circuit immediately and restarts the open timer, also when
    /// it is already open.
    pub fn force_open(&self) {
        update(&self.circuit, &self.config, |c, cfg| c.force_open(cfg));
    }

    /// Closes the circuit immediately.
    pub fn force_closed(&self) {
        update(&self.circuit, &self.config, |c, cfg| c.force_closed(cfg));
    }

    /// Closes the circuit and clears all counters.
    pub fn reset(&self) {
        update(&self.circuit, &self.config, |c, cfg| c.reset(cfg));
    }

    /// The breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig<C> {
        &self.config
    }

    /// Returns a Tower layer whose services share this breaker.
    pub fn layer(&self) -> CircuitBreakerLayer<C> {
        CircuitBreakerLayer::new(self.clone())
    }
}

impl<C> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C> std::fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Mutates the circuit under the lock, then hands the events it produced to
/// the listeners after the lock is released.
fn update<C, R>(
    circuit: &Mutex<Circuit>,
    config: &CircuitBreakerConfig<C>,
    f: impl FnOnce(&mut Circuit, &CircuitBreakerConfig<C>) -> R,
) -> R {
    let (result, events) = {
        let mut circuit = circuit.lock();
        let result = f(&mut circuit, config);
        (result, circuit.take_events())
    };
    for event in &events {
        config.event_listeners.emit(event);
    }
    result
}

/// Admission to run one call. Recording the outcome consumes it; dropping it
/// unrecorded releases a half-open slot.
struct CallPermit<C> {
    circuit: Arc<Mutex<Circuit>>,
    config: Arc<CircuitBreakerConfig<C>>,
    generation: u64,
    completed: bool,
}

impl<C> CallPermit<C> {
    fn complete(mut self, failed: bool) {
        self.completed = true;
        let generation = self.generation;
        update(&self.circuit, &self.config, |c, cfg| {
            if failed {
                c.record_failure(cfg, generation);
            } else {
                c.record_success(cfg, generation);
            }
        });
    }
}

impl<C> Drop for CallPermit<C> {
    fn drop(&mut self) {
        if !self.completed {
            self.circuit.lock().release(self.generation);
        }
    }
}
