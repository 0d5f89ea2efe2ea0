//! Encoder projecting serde records into maps.

use serde_json::Value;

use crate::{error::EventEncodingError, event::Event};

use super::{Envelope, EventEncoder};

/// Projects [`Event::Record`] values field by field.
///
/// The projection is generated at compile time by `#[derive(Serialize)]`;
/// `#[serde(rename = "...")]` selects the destination key of a field. Nested
/// records become nested maps. Map keys are always strings: integer and
/// character keys are rendered as text, and keys that cannot be rendered make
/// the record unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructEncoder {
    skip_null_fields: bool,
}

impl StructEncoder {
    /// Create an encoder that keeps `null` fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop top-level fields whose value is `null`, such as unset `Option`s.
    pub fn with_skip_null_fields(mut self, skip: bool) -> Self {
        self.skip_null_fields = skip;
        self
    }
}

impl EventEncoder for StructEncoder {
    fn encode_event(&self, event: &Event) -> Result<Envelope, EventEncodingError> {
        let Event::Record(record) = event else {
            return Err(EventEncodingError::unsupported(event));
        };
        match record.to_value() {
            Ok(Value::Object(mut map)) => {
                if self.skip_null_fields {
                    map.retain(|_, value| !value.is_null());
                }
                Ok(map)
            }
            _ => Err(EventEncodingError::unsupported(event)),
        }
    }
}
