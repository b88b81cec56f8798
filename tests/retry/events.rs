use resilient_http_retry::RetryConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    Transient,
    Permanent,
}

#[tokio::test(start_paused = true)]
async fn on_retry_sees_index_and_delay() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);

    let config = RetryConfig::builder()
        .max_attempts(4)
        .linear_backoff(Duration::from_millis(100))
        .retry_on(|f: &Failure| *f == Failure::Transient)
        .on_retry(move |retry, delay| s.lock().unwrap().push((retry, delay)))
        .build();

    let _ = config
        .attempt(|| async { Err::<(), _>(Failure::Transient) })
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (0, Duration::from_millis(100)),
            (1, Duration::from_millis(200)),
            (2, Duration::from_millis(300)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn outcome_callbacks_report_attempt_counts() {
    let success = Arc::new(AtomicUsize::new(0));
    let ignored = Arc::new(AtomicUsize::new(0));
    let (s, i) = (Arc::clone(&success), Arc::clone(&ignored));

    let config = RetryConfig::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_millis(1))
        .retry_on(|f: &Failure| *f == Failure::Transient)
        .on_success(move |attempts| s.store(attempts, Ordering::SeqCst))
        .on_ignored_error(move |attempts| i.store(attempts, Ordering::SeqCst))
        .build();

    let calls = AtomicUsize::new(0);
    let _ = config
        .attempt(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Failure::Transient)
                } else {
                    Ok(())
                }
            }
        })
        .await;
    assert_eq!(success.load(Ordering::SeqCst), 3);

    let calls = AtomicUsize::new(0);
    let _ = config
        .attempt(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err::<(), _>(Failure::Transient)
                } else {
                    Err(Failure::Permanent)
                }
            }
        })
        .await;
    assert_eq!(ignored.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn deadline_callback_fires_when_budget_runs_out() {
    let fired = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&fired);

    let config = RetryConfig::builder()
        .max_attempts(10)
        .fixed_backoff(Duration::from_secs(2))
        .max_elapsed(Duration::from_secs(3))
        .retry_all()
        .on_deadline_exceeded(move |attempts| f.store(attempts, Ordering::SeqCst))
        .build();

    let result = config
        .attempt(|| async { Err::<(), _>(Failure::Transient) })
        .await;

    assert_eq!(result.unwrap_err(), Failure::Transient);
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}
