//! Deciding which call outcomes count against the breaker.
//!
//! The breaker only cares whether a finished call was a failure. A
//! [`FailureClassifier`] answers that for a `Result<Res, Err>`; the default
//! treats every `Err` as a failure.

use std::sync::Arc;

/// Classifies a finished call as failure (`true`) or success (`false`).
pub trait FailureClassifier<Res, Err>: Send + Sync {
    /// Returns `true` when `result` should count as a failure.
    fn classify(&self, result: &Result<Res, Err>) -> bool;
}

/// Counts every `Err` as a failure and every `Ok` as a success.
///
/// ```rust
/// use resilient_http_circuitbreaker::classifier::{DefaultClassifier, FailureClassifier};
///
/// let c = DefaultClassifier;
/// assert!(FailureClassifier::<u16, &str>::classify(&c, &Err("refused")));
/// assert!(!FailureClassifier::<u16, &str>::classify(&c, &Ok(200)));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<Res, Err> FailureClassifier<Res, Err> for DefaultClassifier {
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        result.is_err()
    }
}

/// A classifier backed by a closure.
///
/// Useful when some errors say nothing about the peer's health, for example a
/// client-side validation error returned by an upstream:
///
/// ```rust
/// use resilient_http_circuitbreaker::classifier::{FailureClassifier, FnClassifier};
///
/// // Only server errors count against the breaker.
/// let c = FnClassifier::new(|r: &Result<(), u16>| matches!(r, Err(status) if *status >= 500));
///
/// assert!(c.classify(&Err(503)));
/// assert!(!c.classify(&Err(404)));
/// assert!(!c.classify(&Ok(())));
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Res, Err> FailureClassifier<Res, Err> for FnClassifier<F>
where
    F: Fn(&Result<Res, Err>) -> bool + Send + Sync,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        (self.f)(result)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier").finish_non_exhaustive()
    }
}
