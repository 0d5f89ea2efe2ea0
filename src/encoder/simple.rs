//! Encoder for self-encoding events and primitive payloads.

use serde_json::{Map, Value};

use crate::{error::EventEncodingError, event::Event};

use super::{Envelope, EventEncoder};

/// Handles self-encoding events, maps, text and raw bytes.
///
/// JSON objects and strings supplied as [`Event::Value`] are treated like
/// their typed counterparts. Everything else is rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleEncoder;

fn message(text: String) -> Envelope {
    let mut map = Map::with_capacity(1);
    map.insert("message".into(), Value::String(text));
    map
}

impl EventEncoder for SimpleEncoder {
    fn encode_event(&self, event: &Event) -> Result<Envelope, EventEncodingError> {
        match event {
            Event::SelfEncoding(inner) => Ok(inner.encode()),
            Event::Map(map) | Event::Value(Value::Object(map)) => Ok(map.clone()),
            Event::Text(text) | Event::Value(Value::String(text)) => Ok(message(text.clone())),
            Event::Bytes(bytes) => Ok(message(String::from_utf8_lossy(bytes).into_owned())),
            _ => Err(EventEncodingError::unsupported(event)),
        }
    }
}
