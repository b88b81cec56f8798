use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::{Layer, Service, ServiceBuilder, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
enum UpstreamError {
    Unavailable,
    BadRequest,
}

#[tokio::test]
async fn classifier_decides_what_counts() {
    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(2)
        .failure_classifier(|result: &Result<(), UpstreamError>| {
            matches!(result, Err(UpstreamError::Unavailable))
        })
        .build();

    let mut svc = ServiceBuilder::new()
        .layer(breaker.layer())
        .service(tower::service_fn(|req: UpstreamError| async move { Err::<(), _>(req) }));

    for _ in 0..5 {
        let err = svc
            .ready()
            .await
            .unwrap()
            .call(UpstreamError::BadRequest)
            .await
            .unwrap_err();
        assert_eq!(err.into_inner(), Some(UpstreamError::BadRequest));
    }
    assert_eq!(breaker.state(), CircuitState::Closed);

    let _ = svc.ready().await.unwrap().call(UpstreamError::Unavailable).await;
    let _ = svc.ready().await.unwrap().call(UpstreamError::Unavailable).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn open_layer_short_circuits_every_clone() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let inner = tower::service_fn(move |_: ()| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>("down") }
    });

    let breaker = CircuitBreakerConfig::builder().failure_threshold(1).build();
    let svc = breaker.layer().layer(inner);

    let _ = svc.clone().oneshot(()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    for _ in 0..3 {
        let err = svc.clone().oneshot(()).await.unwrap_err();
        assert!(matches!(err, CircuitBreakerError::OpenCircuit));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn manual_overrides() {
    let breaker = CircuitBreakerConfig::builder().failure_threshold(3).build();

    breaker.force_open();
    assert!(breaker.is_open());
    assert!(breaker
        .execute(|| async { Ok::<_, ()>(()) })
        .await
        .unwrap_err()
        .is_circuit_open());

    breaker.force_closed();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.execute(|| async { Ok::<_, ()>(()) }).await.is_ok());

    let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
    breaker.reset();
    assert_eq!(breaker.metrics().consecutive_failures, 0);
}
