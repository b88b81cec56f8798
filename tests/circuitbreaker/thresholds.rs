use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn fail(breaker: &resilient_http_circuitbreaker::CircuitBreaker) {
    let _ = breaker.execute(|| async { Err::<(), _>("boom") }).await;
}

async fn succeed(breaker: &resilient_http_circuitbreaker::CircuitBreaker) {
    let _ = breaker.execute(|| async { Ok::<_, &str>(()) }).await;
}

/// Opens on exactly the threshold-th consecutive failure.
#[tokio::test]
async fn opens_at_threshold() {
    for threshold in 1..=5u32 {
        let breaker = CircuitBreakerConfig::builder()
            .failure_threshold(threshold)
            .build();

        for _ in 1..threshold {
            fail(&breaker).await;
            assert_eq!(breaker.state(), CircuitState::Closed);
        }

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open, "threshold {}", threshold);
    }
}

/// Any success resets the consecutive count.
#[tokio::test]
async fn success_resets_the_count() {
    let breaker = CircuitBreakerConfig::builder().failure_threshold(3).build();

    fail(&breaker).await;
    fail(&breaker).await;
    assert_eq!(breaker.metrics().consecutive_failures, 2);

    succeed(&breaker).await;
    assert_eq!(breaker.metrics().consecutive_failures, 0);

    fail(&breaker).await;
    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Closed);

    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

/// Once open, calls are rejected and the guarded call never runs.
#[tokio::test]
async fn open_breaker_does_not_invoke_call() {
    let breaker = CircuitBreakerConfig::builder().failure_threshold(2).build();
    fail(&breaker).await;
    fail(&breaker).await;

    let invoked = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let invoked = Arc::clone(&invoked);
        let result = breaker
            .execute(move || {
                invoked.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, &str>(()) }
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::OpenCircuit)));
    }

    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejections_are_reported_to_listeners() {
    let rejected = Arc::new(AtomicUsize::new(0));
    let transitions = Arc::new(support::Log::default());
    let r = Arc::clone(&rejected);
    let t = Arc::clone(&transitions);

    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(1)
        .on_call_rejected(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .on_state_transition(move |from, to| t.push(format!("{}->{}", from, to)))
        .build();

    fail(&breaker).await;
    fail(&breaker).await;
    fail(&breaker).await;

    assert_eq!(rejected.load(Ordering::SeqCst), 2);
    assert_eq!(transitions.entries(), vec!["Closed->Open".to_string()]);
}

mod support {
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Log(Mutex<Vec<String>>);

    impl Log {
        pub fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }
}
