//! Encoders turning [`Event`](crate::Event) values into envelopes.
//!
//! Every encoder implements [`EventEncoder`]. [`SimpleEncoder`] covers
//! self-encoding events and primitive payloads, [`StructEncoder`] projects
//! serde records into maps, and [`AutomaticEncoder`] chains encoders, cheapest
//! first, returning the first success. Supporting a new event shape means
//! appending an encoder to the chain.

mod automatic;
mod record;
mod simple;


use serde_json::{Map, Value};

use crate::{error::EventEncodingError, event::Event};

pub use automatic::AutomaticEncoder;
pub use record::StructEncoder;
pub use simple::SimpleEncoder;

/// String-keyed representation of a single event.
pub type Envelope = Map<String, Value>;

/// Trait implemented by all event encoders.
///
/// Encoders are shared between publishing threads and must therefore be
/// `Send + Sync`.
pub trait EventEncoder: Send + Sync {
    /// Encode `event` into an envelope.
    fn encode_event(&self, event: &Event) -> Result<Envelope, EventEncodingError>;
}

impl<E: EventEncoder + ?Sized> EventEncoder for Box<E> {
    fn encode_event(&self, event: &Event) -> Result<Envelope, EventEncodingError> {
        (**self).encode_event(event)
    }
}

impl<E: EventEncoder + ?Sized> EventEncoder for std::sync::Arc<E> {
    fn encode_event(&self, event: &Event) -> Result<Envelope, EventEncodingError> {
        (**self).encode_event(event)
    }
}
