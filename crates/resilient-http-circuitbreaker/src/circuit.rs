use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    Closed = 0,
    /// Calls are rejected until the open duration elapses.
    Open = 1,
    /// A limited number of trial calls decide whether to close or reopen.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Stable name, used for log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a breaker's counters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded since the last success or transition to closed.
    pub consecutive_failures: u32,
    /// Trial calls currently running (half-open only).
    pub half_open_in_flight: u32,
    /// Trial calls that succeeded in the current half-open period.
    pub half_open_successes: u32,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

/// The breaker's mutable state. Always accessed under the breaker's mutex.
///
/// Every transition bumps `generation`. A permit remembers the generation it
/// was issued in, and outcomes from an older generation are dropped: a call
/// admitted while closed that finishes after the breaker opened must not
/// touch the new state's accounting.
///
/// Events are buffered in `pending` and handed to listeners by the caller
/// once the lock is released, so a listener may call back into the breaker.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    generation: u64,
    consecutive_failures: u32,
    half_open_in_flight: u32,
    half_open_successes: u32,
    last_state_change: Instant,
    pending: Vec<CircuitBreakerEvent>,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            generation: 0,
            consecutive_failures: 0,
            half_open_in_flight: 0,
            half_open_successes: 0,
            last_state_change: Instant::now(),
            pending: Vec::new(),
        }
    }

    /// Drains the events produced since the last call.
    pub(crate) fn take_events(&mut self) -> Vec<CircuitBreakerEvent> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            half_open_in_flight: self.half_open_in_flight,
            half_open_successes: self.half_open_successes,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Decides whether a call may run. Returns the permit's generation.
    pub(crate) fn try_acquire<C>(&mut self, config: &CircuitBreakerConfig<C>) -> Option<u64> {
        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.open_duration {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.half_open_in_flight = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                let used = self.half_open_in_flight + self.half_open_successes;
                if used < config.permitted_calls_in_half_open {
                    self.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        };

        if permitted {
            self.pending.push(CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });
            Some(self.generation)
        } else {
            self.pending.push(CircuitBreakerEvent::CallRejected {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
            });

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

            None
        }
    }

    pub(crate) fn record_success<C>(&mut self, config: &CircuitBreakerConfig<C>, generation: u64) {
        if generation != self.generation {
            return;
        }

        self.pending.push(CircuitBreakerEvent::SuccessRecorded {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => self.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
                self.half_open_successes += 1;
                if self.half_open_successes >= config.permitted_calls_in_half_open {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub(crate) fn record_failure<C>(&mut self, config: &CircuitBreakerConfig<C>, generation: u64) {
        if generation != self.generation {
            return;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        self.pending.push(CircuitBreakerEvent::FailureRecorded {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::Closed => {
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config),
            CircuitState::Open => {}
        }
    }

    /// Returns an unused half-open slot, for permits dropped before their
    /// call finished.
    pub(crate) fn release(&mut self, generation: u64) {
        if generation == self.generation && self.state == CircuitState::HalfOpen {
            self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
        }
    }

    pub(crate) fn force_open<C>(&mut self, config: &CircuitBreakerConfig<C>) {
        if self.state == CircuitState::Open {
            // Already open: restart the timer and orphan outstanding permits.
            self.generation = self.generation.wrapping_add(1);
            self.last_state_change = Instant::now();
        } else {
            self.transition_to(CircuitState::Open, config);
        }
    }

    pub(crate) fn force_closed<C>(&mut self, config: &CircuitBreakerConfig<C>) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub(crate) fn reset<C>(&mut self, config: &CircuitBreakerConfig<C>) {
        self.transition_to(CircuitState::Closed, config);
        self.consecutive_failures = 0;
        self.generation = self.generation.wrapping_add(1);
        self.last_state_change = Instant::now();
    }

    fn transition_to<C>(&mut self, state: CircuitState, config: &CircuitBreakerConfig<C>) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        self.pending.push(CircuitBreakerEvent::StateTransition {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(
            breaker = %config.name,
            from = from_state.as_str(),
            to = state.as_str(),
            "circuit breaker state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.generation = self.generation.wrapping_add(1);
        self.last_state_change = Instant::now();
        self.half_open_in_flight = 0;
        self.half_open_successes = 0;
        if state == CircuitState::Closed {
            self.consecutive_failures = 0;
        }
    }
}
