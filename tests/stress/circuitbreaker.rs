//! Circuit breaker stress tests

use super::ConcurrencyTracker;
use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One million calls through a closed breaker.
#[tokio::test]
#[ignore]
async fn stress_one_million_calls() {
    let breaker = CircuitBreakerConfig::builder().failure_threshold(10).build();
    let calls = AtomicUsize::new(0);

    let start = Instant::now();
    for _ in 0..1_000_000 {
        let _ = breaker
            .execute(|| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Ok::<_, ()>(()) }
            })
            .await;
    }
    let elapsed = start.elapsed();

    println!("1M calls completed in {:?}", elapsed);
    println!("Throughput: {:.0} calls/sec", 1_000_000.0 / elapsed.as_secs_f64());

    assert_eq!(calls.load(Ordering::Relaxed), 1_000_000);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Many tasks thrash the breaker between open and closed; it must end in a
/// consistent state with no stuck half-open slots.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_concurrent_thrashing() {
    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(5)
        .open_duration(Duration::from_millis(5))
        .permitted_calls_in_half_open(2)
        .build();
    let tracker = ConcurrencyTracker::new();

    let mut handles = Vec::new();
    for task in 0..200usize {
        let breaker = breaker.clone();
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            for i in 0..500usize {
                let fail = (task + i) % 3 == 0;
                let tracker = Arc::clone(&tracker);
                let _ = breaker
                    .execute(|| async move {
                        tracker.enter();
                        tokio::task::yield_now().await;
                        tracker.exit();
                        if fail {
                            Err(())
                        } else {
                            Ok(())
                        }
                    })
                    .await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    println!("peak concurrency: {}", tracker.peak());
    let metrics = breaker.metrics();
    assert_eq!(metrics.half_open_in_flight, 0);
}
