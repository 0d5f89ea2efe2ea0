//! Tests for the publishing client.

use std::{
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use serde::Serialize;
use serde_json::{Value, json};

use super::*;
use crate::{
    options::{self, ConfigError},
    testing::RecordingConnector,
    transport::{ProtocolVersion, TransportError},
};

#[derive(Serialize)]
struct Login {
    message: &'static str,
    timestamp: DateTime<Utc>,
}

#[fixture]
fn connector() -> RecordingConnector {
    RecordingConnector::new()
}

fn client_with(connector: &RecordingConnector) -> CloudLog {
    CloudLog::new(
        "testindex",
        [
            options::connector(connector.clone()),
            options::source_host("test-host"),
        ],
    )
    .expect("valid client")
}

#[rstest]
fn empty_index_fails_before_options_run() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let option = ClientOption::new(move |_| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    let err = CloudLog::new("", [option]).expect_err("index required");
    assert!(matches!(err, CloudLogError::IndexNotDefined));
    assert!(!ran.load(Ordering::SeqCst));
}

#[rstest]
fn option_failures_are_reported_together() {
    let err = CloudLog::new(
        "testindex",
        [
            options::brokers(Vec::<String>::new()),
            options::ca_certificate(b"not pem".to_vec()),
        ],
    )
    .expect_err("two failures");
    let CloudLogError::Config(errors) = err else {
        panic!("expected configuration errors, got {err}");
    };
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors.errors()[0], ConfigError::BrokersNotSpecified));
    assert!(matches!(errors.errors()[1], ConfigError::CaCertificateInvalid));
}

#[rstest]
fn transport_security_cannot_be_disabled(connector: RecordingConnector) {
    let mut insecure = TransportConfig::default();
    insecure.tls_enabled = false;
    insecure.version = ProtocolVersion::new(0, 9, 0, 0);
    let client = CloudLog::new(
        "testindex",
        [
            options::transport_config(insecure),
            options::connector(connector.clone()),
        ],
    )
    .expect("valid client");
    assert!(client.transport_config().tls_enabled);
    assert!(client.transport_config().version >= ProtocolVersion::V0_10_2_0);

    client.push_event("hello").expect("published");
    let (_, config) = connector.last_connect().expect("connected");
    assert!(config.tls_enabled);
}

#[rstest]
fn defaults_are_exposed(connector: RecordingConnector) {
    let client = CloudLog::new("testindex", [options::connector(connector)]).expect("client");
    assert_eq!(client.index_name(), "testindex");
    assert_eq!(client.brokers(), options::DEFAULT_BROKER_ADDRESSES);
    assert_eq!(client.source_host(), options::default_source_host());
}

#[rstest]
fn empty_batch_does_not_connect(connector: RecordingConnector) {
    let client = client_with(&connector);
    client.push_events(Vec::<Event>::new()).expect("no-op");
    assert_eq!(connector.connect_count(), 0);
    assert!(!client.is_connected());
}

#[rstest]
fn envelope_carries_injected_fields(connector: RecordingConnector) {
    let client = client_with(&connector);
    let before = Utc::now().timestamp_millis();
    client.push_event("hello").expect("published");
    let after = Utc::now().timestamp_millis();

    let envelopes = connector.envelopes();
    assert_eq!(envelopes.len(), 1);
    let envelope = &envelopes[0];
    assert_eq!(envelope["message"], json!("hello"));
    assert_eq!(envelope[SOURCE_HOST_FIELD], json!("test-host"));
    assert_eq!(envelope[CLIENT_TYPE_FIELD], json!(CLIENT_TYPE));
    let stamp = envelope[TIMESTAMP_FIELD].as_i64().expect("integer timestamp");
    assert!((before..=after).contains(&stamp));

    let batches = connector.batches();
    assert_eq!(batches[0][0].topic, "testindex");
}

#[rstest]
fn batch_shares_one_timestamp(connector: RecordingConnector) {
    let client = client_with(&connector);
    client
        .push_events(["first", "second", "third"])
        .expect("published");
    let stamps: Vec<Value> = connector
        .envelopes()
        .into_iter()
        .map(|envelope| envelope[TIMESTAMP_FIELD].clone())
        .collect();
    assert_eq!(stamps.len(), 3);
    assert!(stamps.iter().all(|stamp| *stamp == stamps[0]));
}

#[rstest]
fn supplied_timestamps_are_normalised(connector: RecordingConnector) {
    let client = client_with(&connector);
    let time = Utc.with_ymd_and_hms(2019, 3, 4, 5, 6, 7).unwrap();
    client
        .push_events([
            Event::record(Login {
                message: "login",
                timestamp: time,
            }),
            Event::from(json!({"message": "epoch", "timestamp": 1_234_i64})),
        ])
        .expect("published");
    let envelopes = connector.envelopes();
    assert_eq!(envelopes[0][TIMESTAMP_FIELD], json!(time.timestamp_millis()));
    assert_eq!(envelopes[1][TIMESTAMP_FIELD], json!(1_234));
}

#[rstest]
fn injected_fields_override_event_values(connector: RecordingConnector) {
    let client = client_with(&connector);
    client
        .push_event(json!({"message": "m", "cloudlog_source_host": "spoofed"}))
        .expect("published");
    assert_eq!(connector.envelopes()[0][SOURCE_HOST_FIELD], json!("test-host"));
}

#[rstest]
fn single_sequence_is_flattened_once(connector: RecordingConnector) {
    let client = client_with(&connector);
    let batch = Event::Sequence(vec![Event::from("a"), Event::from("b")]);
    client.push_events([batch]).expect("published");
    assert_eq!(connector.batches()[0].len(), 2);

    let nested = Event::Sequence(vec![Event::Sequence(vec![Event::from("inner")])]);
    let err = client.push_events([nested]).expect_err("inner sequence stays nested");
    assert_eq!(err.encoding_event().map(Event::kind), Some("sequence"));
}

#[rstest]
fn json_array_argument_is_flattened(connector: RecordingConnector) {
    let client = client_with(&connector);
    client
        .push_event(json!([{"message": "a"}, {"message": "b"}]))
        .expect("published");
    assert_eq!(connector.envelopes().len(), 2);
}

#[rstest]
fn encode_failure_aborts_whole_batch(connector: RecordingConnector) {
    let client = client_with(&connector);
    let err = client
        .push_events([Event::from("ok"), Event::from(json!(42)), Event::from("never")])
        .expect_err("number is unsupported");
    assert!(matches!(err, CloudLogError::Encoding(_)));
    assert_eq!(connector.connect_count(), 0);
    assert!(connector.batches().is_empty());
}

#[rstest]
fn failed_connect_is_retried_on_next_publish() {
    let connector = RecordingConnector::new().failing_connects(1);
    let client = client_with(&connector);

    let err = client.push_event("first").expect_err("connect fails once");
    assert!(matches!(
        err,
        CloudLogError::Transport(TransportError::Connect { .. })
    ));
    assert!(!client.is_connected());

    client.push_event("second").expect("reconnected");
    assert_eq!(connector.connect_count(), 2);
    assert_eq!(connector.envelopes()[0]["message"], json!("second"));
}

#[rstest]
fn connection_is_reused(connector: RecordingConnector) {
    let client = client_with(&connector);
    client.push_event("one").expect("published");
    client.push_event("two").expect("published");
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(connector.batches().len(), 2);
}

#[rstest]
fn close_is_idempotent_and_reconnects_lazily(connector: RecordingConnector) {
    let client = client_with(&connector);
    client.close().expect("closing an unconnected client");
    client.push_event("before").expect("published");
    assert!(client.is_connected());

    client.close().expect("first close");
    client.close().expect("second close");
    assert_eq!(connector.close_count(), 1);
    assert!(!client.is_connected());

    client.push_event("after").expect("published");
    assert_eq!(connector.connect_count(), 2);
}

#[rstest]
fn drop_closes_connection(connector: RecordingConnector) {
    let client = client_with(&connector);
    client.push_event("hello").expect("published");
    drop(client);
    assert_eq!(connector.close_count(), 1);
}

#[rstest]
fn rejected_messages_are_reported() {
    let connector = RecordingConnector::new().rejecting([1]);
    let client = client_with(&connector);
    let err = client.push_events(["a", "b"]).expect_err("one rejected");
    match err {
        CloudLogError::Transport(TransportError::Send { total, failures }) => {
            assert_eq!(total, 2);
            assert_eq!(failures[0].index, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn concurrent_first_use_connects_once() {
    const THREADS: usize = 8;
    let connector = RecordingConnector::new().with_connect_delay(Duration::from_millis(50));
    let client = Arc::new(client_with(&connector));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.push_event(format!("event {i}").into())
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("published");
    }

    assert_eq!(connector.connect_count(), 1);
    assert_eq!(connector.envelopes().len(), THREADS);
}

#[rstest]
fn push_event_trait_is_object_safe(connector: RecordingConnector) {
    let client: Arc<dyn PushEvent> = Arc::new(client_with(&connector));
    client.push_event(Event::from("via trait")).expect("published");
    assert_eq!(connector.envelopes()[0]["message"], json!("via trait"));
}
