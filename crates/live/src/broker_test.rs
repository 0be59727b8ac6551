//! Tests for the live broker

use super::*;
use theia_filter::FilterSpec;
use theia_protocol::parse;

fn make_event(id: &str, content: &str) -> Event {
    Event::new(id, 1000.0, "test-source", vec![], content)
}

fn compile(json: &str) -> Filter {
    Filter::compile(&FilterSpec::from_json(json).unwrap()).unwrap()
}

fn received_ids(payloads: &[Arc<str>]) -> Vec<String> {
    payloads
        .iter()
        .map(|p| parse(p.as_bytes()).unwrap().id)
        .collect()
}

#[tokio::test]
async fn test_dispatch_with_no_subscribers_is_noop() {
    let broker = Broker::new();
    broker.dispatch(&make_event("a", "anything"));
    assert_eq!(broker.stats().dispatched, 0);
}

#[tokio::test]
async fn test_matching_subscriber_receives_in_dispatch_order() {
    let broker = Broker::new();
    let (_id, mut rx) = broker.subscribe(compile(r#"{"content":"\\[ERR\\]"}"#)).unwrap();

    broker.dispatch(&make_event("e1", "ok"));
    broker.dispatch(&make_event("e2", "[ERR] a"));
    broker.dispatch(&make_event("e3", "[ERR] b"));

    let mut got = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        got.push(payload);
    }
    assert_eq!(received_ids(&got), vec!["e2", "e3"]);
}

#[tokio::test]
async fn test_each_subscriber_filtered_independently() {
    let broker = Broker::new();
    let (_a, mut rx_err) = broker.subscribe(compile(r#"{"content":"ERR"}"#)).unwrap();
    let (_b, mut rx_all) = broker.subscribe(compile("{}")).unwrap();

    broker.dispatch(&make_event("e1", "ok"));
    broker.dispatch(&make_event("e2", "ERR"));

    let mut err_events = Vec::new();
    while let Ok(p) = rx_err.try_recv() {
        err_events.push(p);
    }
    let mut all_events = Vec::new();
    while let Ok(p) = rx_all.try_recv() {
        all_events.push(p);
    }

    assert_eq!(received_ids(&err_events), vec!["e2"]);
    assert_eq!(received_ids(&all_events), vec!["e1", "e2"]);
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let broker = Broker::new();
    let (id, mut rx) = broker.subscribe(compile("{}")).unwrap();

    broker.dispatch(&make_event("e1", ""));
    broker.unsubscribe(id).unwrap();
    broker.dispatch(&make_event("e2", ""));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
    assert_eq!(broker.subscriber_count(), 0);
}

#[tokio::test]
async fn test_unsubscribe_unknown_id_fails() {
    let broker = Broker::new();
    assert!(matches!(
        broker.unsubscribe(42),
        Err(LiveError::NotFound { id: 42 })
    ));
}

#[tokio::test]
async fn test_closed_subscriber_evicted_on_dispatch() {
    let broker = Broker::new();
    let (_id, rx) = broker.subscribe(compile("{}")).unwrap();
    drop(rx);

    broker.dispatch(&make_event("e1", ""));
    assert_eq!(broker.subscriber_count(), 0);
}

#[tokio::test]
async fn test_congested_subscriber_dropped_within_grace() {
    // Buffer of one, generous grace: overflow drops events but keeps the
    // subscription alive.
    let broker = Broker::with_limits(1, Duration::from_secs(60));
    let (_id, mut rx) = broker.subscribe(compile("{}")).unwrap();

    broker.dispatch(&make_event("e1", ""));
    broker.dispatch(&make_event("e2", ""));
    broker.dispatch(&make_event("e3", ""));

    assert_eq!(broker.subscriber_count(), 1);
    let first = rx.try_recv().unwrap();
    assert_eq!(received_ids(&[first]), vec!["e1"]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_slow_subscriber_evicted_past_grace() {
    let broker = Broker::with_limits(1, Duration::from_millis(20));
    let (_slow, _rx_slow_kept_full) = broker.subscribe(compile("{}")).unwrap();
    let (_ok, mut rx_ok) = broker.subscribe(compile("{}")).unwrap();

    let mut got = Vec::new();
    broker.dispatch(&make_event("e1", "")); // fills the slow buffer
    got.push(rx_ok.try_recv().unwrap());
    broker.dispatch(&make_event("e2", "")); // slow subscriber congested
    got.push(rx_ok.try_recv().unwrap());
    tokio::time::sleep(Duration::from_millis(40)).await;
    broker.dispatch(&make_event("e3", "")); // past grace: evicted
    got.push(rx_ok.try_recv().unwrap());

    // The slow subscriber is gone; the healthy one received everything.
    assert_eq!(broker.subscriber_count(), 1);
    assert_eq!(received_ids(&got), vec!["e1", "e2", "e3"]);
}

#[tokio::test]
async fn test_delivery_resets_congestion_clock() {
    let broker = Broker::with_limits(1, Duration::from_millis(20));
    let (_id, mut rx) = broker.subscribe(compile("{}")).unwrap();

    broker.dispatch(&make_event("e1", ""));
    broker.dispatch(&make_event("e2", "")); // congested
    tokio::time::sleep(Duration::from_millis(40)).await;

    rx.try_recv().unwrap(); // drain: buffer has room again
    broker.dispatch(&make_event("e3", "")); // succeeds, clock resets

    assert_eq!(broker.subscriber_count(), 1);
}

#[tokio::test]
async fn test_cleanup_reclaims_vanished_subscribers() {
    let broker = Broker::new();
    let (_a, rx_a) = broker.subscribe(compile("{}")).unwrap();
    let (_b, _rx_b) = broker.subscribe(compile("{}")).unwrap();
    drop(rx_a);

    assert_eq!(broker.cleanup_disconnected(), 1);
    assert_eq!(broker.subscriber_count(), 1);
}

#[tokio::test]
async fn test_stats_count_deliveries() {
    let broker = Broker::new();
    let (_id, _rx) = broker.subscribe(compile(r#"{"content":"ERR"}"#)).unwrap();

    broker.dispatch(&make_event("e1", "ok"));
    broker.dispatch(&make_event("e2", "ERR"));

    let stats = broker.stats();
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.subscriber_count, 1);
}
