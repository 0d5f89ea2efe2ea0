//! Encoder trying a chain of encoders in order.

use crate::{error::EventEncodingError, event::Event};

use super::{Envelope, EventEncoder, SimpleEncoder, StructEncoder};

/// Tries each encoder in turn and returns the first success.
pub struct AutomaticEncoder {
    encoders: Vec<Box<dyn EventEncoder>>,
}

impl AutomaticEncoder {
    /// Chain of [`SimpleEncoder`] followed by [`StructEncoder`].
    pub fn new() -> Self {
        Self {
            encoders: vec![Box::new(SimpleEncoder), Box::new(StructEncoder::new())],
        }
    }

    /// Build a chain from explicit encoders.
    pub fn from_encoders(encoders: Vec<Box<dyn EventEncoder>>) -> Self {
        Self { encoders }
    }

    /// Append an encoder to the end of the chain.
    pub fn with_encoder(mut self, encoder: impl EventEncoder + 'static) -> Self {
        self.encoders.push(Box::new(encoder));
        self
    }

    /// Number of encoders in the chain.
    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl Default for AutomaticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEncoder for AutomaticEncoder {
    fn encode_event(&self, event: &Event) -> Result<Envelope, EventEncodingError> {
        self.encoders
            .iter()
            .find_map(|encoder| encoder.encode_event(event).ok())
            .ok_or_else(|| EventEncodingError::unsupported(event))
    }
}

impl std::fmt::Debug for AutomaticEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomaticEncoder")
            .field("encoders", &self.encoders.len())
            .finish()
    }
}
