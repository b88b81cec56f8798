use crate::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How many attempts to make, how long to wait between them and which
/// errors qualify.
pub struct RetryPolicy<E> {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns `true` if `error` may be retried.
    ///
    /// With no predicate configured nothing is retried.
    pub fn should_retry(&self, error: &E) -> bool {
        self.predicate
            .as_ref()
            .map(|predicate| predicate(error))
            .unwrap_or(false)
    }

    /// Delay before retry `retry` (zero-based).
    pub fn next_backoff(&self, retry: usize) -> Duration {
        self.interval_fn.next_interval(retry)
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            interval_fn: Arc::clone(&self.interval_fn),
            predicate: self.predicate.clone(),
        }
    }
}
