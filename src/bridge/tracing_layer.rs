//! Bridge for `tracing`.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{
    Event as TracingEvent, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

use crate::{client::PushEvent, event::Event};

use super::{
    document::{Document, MODULE_FIELD},
    forwarder::{EventForwarder, ForwarderConfig},
    is_internal,
};

const MESSAGE_FIELD: &str = "message";
const SPANS_FIELD: &str = "spans";

/// `tracing_subscriber` layer publishing events to CloudLog.
///
/// Event fields other than `message` land in the document's `fields`
/// alongside `module`, `caller` and, inside spans, the span names from the
/// root down as `spans`. Events targeted at this crate are never forwarded.
#[derive(Debug)]
pub struct CloudLogLayer {
    forwarder: EventForwarder,
    level: LevelFilter,
}

impl CloudLogLayer {
    pub fn new(client: impl PushEvent + 'static) -> Self {
        Self::with_config(client, ForwarderConfig::default())
    }

    pub fn with_config(client: impl PushEvent + 'static, config: ForwarderConfig) -> Self {
        Self {
            forwarder: EventForwarder::with_config(client, config),
            level: LevelFilter::INFO,
        }
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn forwarder(&self) -> &EventForwarder {
        &self.forwarder
    }
}

impl<S> Layer<S> for CloudLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &TracingEvent<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.level || is_internal(metadata.target()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut document = Document::new(visitor.message, metadata.level().as_str())
            .with_field(MODULE_FIELD, metadata.target())
            .with_caller(metadata.file(), metadata.line());
        document.fields.extend(visitor.fields);

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<Value> = scope
                .from_root()
                .map(|span| Value::from(span.name()))
                .collect();
            if !spans.is_empty() {
                document.fields.insert(SPANS_FIELD.into(), Value::Array(spans));
            }
        }

        let _ = self.forwarder.forward(Event::from(document));
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            self.message = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }
}
