//! Event values accepted by the publishing client.
//!
//! Callers hand the client arbitrary application data. [`Event`] is the closed
//! set of shapes the encoder chain understands: values that know how to encode
//! themselves, primitive payloads (maps, text, raw bytes), serde-derived
//! records, loose JSON values, and sequences of events.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use serde::Serialize;
use serde_json::{Map, Value};

/// Capability implemented by events that produce their own envelope.
///
/// The encoder calls [`encode`](SelfEncoding::encode) directly and never
/// inspects the value further, so this is the cheapest path through the chain.
pub trait SelfEncoding: Send + Sync {
    /// Produce the string-keyed representation of the event.
    fn encode(&self) -> Map<String, Value>;
}

/// Type-erased serde record.
///
/// Implemented for every `Serialize + Send + Sync` type. Field keys follow the
/// serde attributes on the type, so `#[serde(rename = "message")]` is the
/// field-tag convention for records.
pub trait Record: Send + Sync {
    /// Project the record into a JSON value.
    fn to_value(&self) -> serde_json::Result<Value>;

    /// Rust type name of the record, used in diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T> Record for T
where
    T: Serialize + Send + Sync,
{
    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A single application event.
#[derive(Clone)]
pub enum Event {
    /// Value that encodes itself.
    SelfEncoding(Arc<dyn SelfEncoding>),
    /// String-keyed map passed through unchanged.
    Map(Map<String, Value>),
    /// Plain text, wrapped as `{"message": text}`.
    Text(String),
    /// Raw bytes decoded as text and wrapped as `{"message": text}`.
    Bytes(Vec<u8>),
    /// Serde record projected field by field.
    Record(Arc<dyn Record>),
    /// Loose JSON value.
    Value(Value),
    /// Ordered sequence of events. Flattened once when it is the only
    /// argument of a publish call.
    Sequence(Vec<Event>),
}

impl Event {
    /// Wrap a value implementing [`SelfEncoding`].
    pub fn self_encoding<T: SelfEncoding + 'static>(value: T) -> Self {
        Self::SelfEncoding(Arc::new(value))
    }

    /// Wrap a serde record.
    pub fn record<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Self::Record(Arc::new(value))
    }

    /// Short description of the event's shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SelfEncoding(_) => "self-encoding event",
            Self::Map(_) => "map",
            Self::Text(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Record(record) => record.type_name(),
            Self::Value(value) => match value {
                Value::Null => "null",
                Value::Bool(_) => "bool",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Array(_) => "array",
                Value::Object(_) => "map",
            },
            Self::Sequence(_) => "sequence",
        }
    }

    /// Split a sequence-shaped event into its elements; other shapes are
    /// handed back unchanged.
    pub(crate) fn into_sequence(self) -> Result<Vec<Event>, Event> {
        match self {
            Self::Sequence(events) => Ok(events),
            Self::Value(Value::Array(values)) => Ok(values.into_iter().map(Event::from).collect()),
            other => Err(other),
        }
    }
}

/// Apply the single-sequence convenience: when exactly one event is supplied
/// and it is a sequence, its elements become the batch. Only one level is
/// unwrapped.
pub(crate) fn flatten_single_sequence(mut events: Vec<Event>) -> Vec<Event> {
    if events.len() != 1 {
        return events;
    }
    let Some(only) = events.pop() else {
        return events;
    };
    match only.into_sequence() {
        Ok(inner) => inner,
        Err(event) => vec![event],
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfEncoding(_) => f.write_str("SelfEncoding(..)"),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Record(record) => f.debug_tuple("Record").field(&record.type_name()).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Sequence(events) => f.debug_tuple("Sequence").field(events).finish(),
        }
    }
}

impl From<String> for Event {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Event {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for Event {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Event {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Map<String, Value>> for Event {
    fn from(value: Map<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl From<HashMap<String, Value>> for Event {
    fn from(value: HashMap<String, Value>) -> Self {
        Self::Map(value.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Event {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value.into_iter().collect())
    }
}

impl From<Value> for Event {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<Event>> for Event {
    fn from(value: Vec<Event>) -> Self {
        Self::Sequence(value)
    }
}
