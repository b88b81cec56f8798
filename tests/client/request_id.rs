use super::{client, config, get, ScriptedTransport, Step};
use resilient_http::context::with_request_id;

fn ids(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

#[tokio::test(start_paused = true)]
async fn scoped_id_is_sent_on_every_attempt() {
    let script = vec![Step::Respond(500, ""), Step::Respond(502, "")];
    let transport = ScriptedTransport::new(script, Step::Respond(200, ""));
    let client = client(config(3, 10), &transport);

    with_request_id("req-1234", client.send(get())).await.unwrap();

    assert_eq!(transport.request_ids(), ids(&["req-1234", "req-1234", "req-1234"]));
}

#[tokio::test(start_paused = true)]
async fn explicit_id_wins_over_scope() {
    let transport = ScriptedTransport::always(200);
    let client = client(config(0, 10), &transport);

    with_request_id("scoped", client.send(get().request_id("explicit")))
        .await
        .unwrap();

    assert_eq!(transport.request_ids(), ids(&["explicit"]));
}

#[tokio::test(start_paused = true)]
async fn no_id_means_no_header() {
    let transport = ScriptedTransport::always(200);
    let client = client(config(0, 10), &transport);

    client.send(get()).await.unwrap();

    assert_eq!(transport.request_ids(), vec![None]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_scopes_do_not_leak() {
    let transport = ScriptedTransport::always(200);
    let client = client(config(0, 10), &transport);

    let a = with_request_id("a", client.send(get()));
    let b = with_request_id("b", client.send(get()));
    let (a, b) = tokio::join!(a, b);
    assert!(a.is_ok() && b.is_ok());

    let mut seen = transport.request_ids();
    seen.sort();
    assert_eq!(seen, ids(&["a", "b"]));
}
