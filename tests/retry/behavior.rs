use super::Status;
use resilient_http_retry::RetryConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use futures::future::{ready, Ready};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

/// Answers with the scripted statuses in order, then 200 once they run out.
#[derive(Clone)]
struct Scripted {
    statuses: Arc<Vec<u16>>,
    calls: Arc<AtomicUsize>,
}

impl Service<()> for Scripted {
    type Response = u16;
    type Error = Status;
    type Future = Ready<Result<u16, Status>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Status>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self.statuses.get(n).copied().unwrap_or(200);
        if status >= 400 {
            ready(Err(Status(status)))
        } else {
            ready(Ok(status))
        }
    }
}

fn scripted(statuses: Vec<u16>, calls: Arc<AtomicUsize>) -> Scripted {
    Scripted {
        statuses: Arc::new(statuses),
        calls,
    }
}

fn status_retry(max_attempts: usize) -> RetryConfig<Status> {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .linear_backoff(Duration::from_millis(10))
        .retry_on(Status::is_retryable)
        .build()
}

#[tokio::test(start_paused = true)]
async fn client_errors_get_exactly_one_attempt() {
    for status in [400u16, 401, 404, 409, 422, 429] {
        let calls = Arc::new(AtomicUsize::new(0));
        let svc = status_retry(5)
            .layer()
            .layer(scripted(vec![status], Arc::clone(&calls)));

        let err = svc.oneshot(()).await.unwrap_err();
        assert_eq!(err, Status(status));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "status {}", status);
    }
}

#[tokio::test(start_paused = true)]
async fn server_errors_retry_until_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = status_retry(4)
        .layer()
        .layer(scripted(vec![500, 502, 503], Arc::clone(&calls)));

    assert_eq!(svc.oneshot(()).await.unwrap(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_the_last_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = status_retry(3)
        .layer()
        .layer(scripted(vec![500, 502, 504, 200], Arc::clone(&calls)));

    assert_eq!(svc.oneshot(()).await.unwrap_err(), Status(504));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn terminal_error_after_retries_stops_the_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = status_retry(5)
        .layer()
        .layer(scripted(vec![503, 404], Arc::clone(&calls)));

    assert_eq!(svc.oneshot(()).await.unwrap_err(), Status(404));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn single_attempt_config_never_retries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = status_retry(1)
        .layer()
        .layer(scripted(vec![500], Arc::clone(&calls)));

    assert!(svc.oneshot(()).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
