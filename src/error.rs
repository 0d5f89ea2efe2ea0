//! Error taxonomy surfaced by the publishing client.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{event::Event, options::ConfigErrors, transport::TransportError};

/// Top-level error returned by [`CloudLog`](crate::CloudLog) operations.
#[derive(Debug, Error)]
pub enum CloudLogError {
    /// The target index name was empty.
    #[error("target index is not defined")]
    IndexNotDefined,
    /// One or more configuration options failed.
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    /// An event could not be encoded into an envelope.
    #[error(transparent)]
    Encoding(#[from] EventEncodingError),
    /// An envelope could not be serialised.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    /// Connecting or sending failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// An event could not be turned into an envelope.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EventEncodingError {
    /// Human readable description.
    pub message: String,
    /// The event that caused the failure.
    pub event: Event,
}

impl EventEncodingError {
    /// No encoder supports the supplied event.
    pub fn unsupported(event: &Event) -> Self {
        Self {
            message: format!("cannot encode event, type {} is unsupported", event.kind()),
            event: event.clone(),
        }
    }
}

/// Serialising an envelope to wire bytes failed.
#[derive(Debug, Error)]
#[error("marshal of event failed: {source}")]
pub struct MarshalError {
    /// The envelope that could not be serialised.
    pub event_map: Map<String, Value>,
    /// Underlying serde failure.
    #[source]
    pub source: serde_json::Error,
}

impl MarshalError {
    pub fn new(event_map: Map<String, Value>, source: serde_json::Error) -> Self {
        Self { event_map, source }
    }
}

impl CloudLogError {
    /// Return the offending event when the error is an encoding failure.
    pub fn encoding_event(&self) -> Option<&Event> {
        match self {
            Self::Encoding(err) => Some(&err.event),
            _ => None,
        }
    }
}
