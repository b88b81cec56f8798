use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Closed breakers do not serialize calls.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closed_breaker_runs_calls_concurrently() {
    let breaker = CircuitBreakerConfig::builder().failure_threshold(5).build();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let breaker = breaker.clone();
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            breaker
                .execute(|| async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ()>(())
                })
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert!(peak.load(Ordering::SeqCst) > 1);
}

/// Concurrent failures are all counted; none are lost.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_open_the_breaker() {
    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(100)
        .build();

    let mut handles = Vec::new();
    for _ in 0..99 {
        let breaker = breaker.clone();
        handles.push(tokio::spawn(async move {
            let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(breaker.metrics().consecutive_failures, 99);
    assert_eq!(breaker.state(), CircuitState::Closed);

    let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

/// While a half-open trial is outstanding, every other caller fails fast and
/// only the trial reaches the upstream.
#[tokio::test(start_paused = true)]
async fn only_one_trial_reaches_upstream() {
    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(1)
        .open_duration(Duration::from_secs(5))
        .build();
    let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
    tokio::time::advance(Duration::from_secs(5)).await;

    let upstream_calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());

    let trial = {
        let breaker = breaker.clone();
        let upstream_calls = Arc::clone(&upstream_calls);
        let release = Arc::clone(&release);
        tokio::spawn(async move {
            breaker
                .execute(|| async move {
                    upstream_calls.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Ok::<_, ()>(())
                })
                .await
        })
    };
    tokio::task::yield_now().await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    let mut others = Vec::new();
    for _ in 0..20 {
        let breaker = breaker.clone();
        let upstream_calls = Arc::clone(&upstream_calls);
        others.push(tokio::spawn(async move {
            breaker
                .execute(|| async move {
                    upstream_calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(())
                })
                .await
        }));
    }
    for other in others {
        assert!(matches!(other.await.unwrap(), Err(CircuitBreakerError::OpenCircuit)));
    }

    release.notify_one();
    assert!(trial.await.unwrap().is_ok());

    assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// A trial abandoned mid-flight hands its slot back.
#[tokio::test(start_paused = true)]
async fn cancelled_trial_frees_the_slot() {
    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(1)
        .open_duration(Duration::from_secs(1))
        .build();
    let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
    tokio::time::advance(Duration::from_secs(1)).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        breaker.execute(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ()>(())
        }),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(breaker.metrics().half_open_in_flight, 0);

    assert!(breaker.execute(|| async { Ok::<_, ()>(()) }).await.is_ok());
    assert_eq!(breaker.state(), CircuitState::Closed);
}
