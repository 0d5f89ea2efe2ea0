//! Benchmarks for the publish path: encoding, envelope assembly and batching.

use cloudlog::{
    AutomaticEncoder, CloudLog, Event, EventEncoder, options,
    transport::{Connection, Connector, ProducerMessage, TransportConfig, TransportError},
};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use serde::Serialize;
use serde_json::json;

/// Transport that accepts every batch and keeps nothing.
struct NullConnector;

struct NullConnection;

impl Connector for NullConnector {
    fn connect(
        &self,
        _brokers: &[String],
        _config: &TransportConfig,
    ) -> Result<Box<dyn Connection>, TransportError> {
        Ok(Box::new(NullConnection))
    }
}

impl Connection for NullConnection {
    fn send_batch(&self, messages: Vec<ProducerMessage>) -> Result<(), TransportError> {
        black_box(messages);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct Request {
    message: &'static str,
    method: &'static str,
    path: &'static str,
    status: u16,
    duration_ms: f64,
}

fn request() -> Request {
    Request {
        message: "request served",
        method: "GET",
        path: "/api/v1/items",
        status: 200,
        duration_ms: 12.5,
    }
}

fn bench_encoders(c: &mut Criterion) {
    let encoder = AutomaticEncoder::new();
    let text = Event::from("plain log line");
    let map = Event::from(json!({"message": "map event", "user": "alice", "attempt": 3}));
    let record = Event::record(request());

    let mut group = c.benchmark_group("encode");
    group.bench_function("text", |b| b.iter(|| encoder.encode_event(black_box(&text))));
    group.bench_function("map", |b| b.iter(|| encoder.encode_event(black_box(&map))));
    group.bench_function("record", |b| {
        b.iter(|| encoder.encode_event(black_box(&record)))
    });
    group.finish();
}

fn bench_publish(c: &mut Criterion) {
    let client = CloudLog::new(
        "bench-index",
        [
            options::connector(NullConnector),
            options::source_host("bench-host"),
        ],
    )
    .expect("valid client");

    let mut group = c.benchmark_group("publish");
    group.bench_function("single_record", |b| {
        b.iter(|| client.push_event(Event::record(request())))
    });
    for size in [10usize, 100] {
        group.bench_function(format!("batch_{size}"), |b| {
            b.iter_batched(
                || (0..size).map(|_| Event::record(request())).collect::<Vec<_>>(),
                |events| client.push_events(events),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encoders, bench_publish);
criterion_main!(benches);
