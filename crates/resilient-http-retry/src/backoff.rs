//! Delay strategies between attempts.
//!
//! An [`IntervalFunction`] maps the zero-based index of a retry to the delay
//! that precedes it: index 0 is the wait before the second attempt.

use std::sync::Arc;
use std::time::Duration;

/// Computes the delay before a retry.
pub trait IntervalFunction: Send + Sync {
    /// Delay before retry number `retry + 1` (so `retry` is zero-based).
    fn next_interval(&self, retry: usize) -> Duration;
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Waits `interval` before each retry.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.interval
    }
}

/// Delay grows by `base` with every retry: `base`, `2 * base`, `3 * base`, ...
///
/// ```rust
/// use resilient_http_retry::{IntervalFunction, LinearBackoff};
/// use std::time::Duration;
///
/// let b = LinearBackoff::new(Duration::from_millis(100));
/// assert_eq!(b.next_interval(0), Duration::from_millis(100));
/// assert_eq!(b.next_interval(2), Duration::from_millis(300));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    base: Duration,
    max_interval: Option<Duration>,
}

impl LinearBackoff {
    /// Linear backoff with step `base`.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            max_interval: None,
        }
    }

    /// Caps every delay at `max`.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.max_interval = Some(max);
        self
    }
}

impl IntervalFunction for LinearBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let factor = u32::try_from(retry.saturating_add(1)).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor);
        match self.max_interval {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Delay multiplies with every retry: `initial`, `initial * m`, `initial * m^2`, ...
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Exponential backoff starting at `initial` and doubling.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor. Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps every delay at `max`.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.max_interval = Some(max);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exp);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.max_interval {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// A delay strategy backed by a closure.
pub struct FnInterval<F> {
    f: Arc<F>,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Wraps `f`, which receives the zero-based retry index.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, retry: usize) -> Duration {
        (self.f)(retry)
    }
}
