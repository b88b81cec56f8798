//! Circuit breaker metrics regression tests

use super::helpers::*;
use resilient_http_circuitbreaker::CircuitBreakerConfig;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("metrics_cb")
        .failure_threshold(2)
        .build();

    let _ = breaker.execute(|| async { Ok::<_, ()>(()) }).await;
    let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
    let _ = breaker.execute(|| async { Err::<(), _>(()) }).await;
    let _ = breaker.execute(|| async { Ok::<_, ()>(()) }).await;

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "Closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "Open");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics_cb");
}
