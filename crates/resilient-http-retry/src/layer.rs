use crate::{Retry, RetryConfig};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies retry logic to a service.
///
/// ```
/// use resilient_http_retry::RetryConfig;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum FetchError { Unreachable, BadRequest }
///
/// let layer = RetryConfig::<FetchError>::builder()
///     .max_attempts(4)
///     .linear_backoff(Duration::from_millis(250))
///     .retry_on(|e| matches!(e, FetchError::Unreachable))
///     .build()
///     .layer();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(tower::service_fn(|req: String| async move { Ok::<_, FetchError>(req) }));
/// # let _ = service;
/// ```
pub struct RetryLayer<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryLayer<E> {
    /// Creates a layer from `config`.
    pub fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
