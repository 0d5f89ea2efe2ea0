//! Boundary to the reliable-delivery transport.
//!
//! The client never speaks a broker protocol itself. It asks a [`Connector`]
//! for a [`Connection`] and hands it batches of [`ProducerMessage`]s. The
//! transport reports success or the set of messages that failed.
//! [`KafkaConnector`] is the bundled implementation, producing to the
//! brokers through the `kafka` client over TLS.

mod config;
mod producer;
mod tls;


use chrono::{DateTime, Utc};
use thiserror::Error;

pub use config::{
    DEFAULT_DIAL_TIMEOUT, DEFAULT_KEEP_ALIVE, DEFAULT_MAX_MESSAGE_BYTES,
    DEFAULT_MAX_OPEN_REQUESTS, DEFAULT_READ_TIMEOUT, DEFAULT_RETRY_BACKOFF, DEFAULT_RETRY_MAX,
    DEFAULT_WRITE_TIMEOUT, MINIMUM_PROTOCOL_VERSION, ProtocolVersion, RequiredAcks,
    TransportConfig,
};
pub use producer::{CLIENT_ID, KafkaConnector};
pub use tls::{ClientIdentity, MINIMUM_TLS_VERSION, TlsConfig, TlsError, certificates_from_pem};

/// A message addressed to one index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerMessage {
    /// Destination index/topic.
    pub topic: String,
    /// Serialised envelope.
    pub payload: Vec<u8>,
    /// Time the batch was published. The bundled producer speaks a message
    /// format without timestamps and does not send it.
    pub timestamp: DateTime<Utc>,
}

/// A single message the transport failed to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageFailure {
    /// Position of the message within the batch.
    pub index: usize,
    pub topic: String,
    pub reason: String,
}

/// Errors reported by connectors and connections.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker list was empty.
    #[error("no brokers configured")]
    NoBrokers,
    /// A broker address was not of the form `host:port`.
    #[error("invalid broker address {0:?}; expected host:port")]
    InvalidBroker(String),
    /// The configuration asked for an unencrypted connection.
    #[error("transport security must be enabled")]
    TlsDisabled,
    /// Building the TLS connector failed.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] openssl::error::ErrorStack),
    /// No broker could be reached.
    #[error("unable to connect to any broker in {brokers:?}: {reason}")]
    Connect { brokers: Vec<String>, reason: String },
    /// A message exceeded the configured size limit.
    #[error("message {index} is {size} bytes, exceeding the {max} byte limit")]
    MessageTooLarge {
        index: usize,
        size: usize,
        max: usize,
    },
    /// Some or all messages of a batch were not acknowledged.
    #[error("{} of {total} messages failed to deliver", .failures.len())]
    Send {
        total: usize,
        failures: Vec<MessageFailure>,
    },
    /// A produce request failed as a whole.
    #[error("produce request failed: {0}")]
    Request(String),
    /// The connection was closed.
    #[error("connection is closed")]
    Closed,
}

/// Establishes transport connections.
pub trait Connector: Send + Sync {
    /// Connect to the cluster reachable through `brokers`.
    fn connect(
        &self,
        brokers: &[String],
        config: &TransportConfig,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// An established transport connection.
///
/// Connections are shared by concurrent publishers, so both operations take
/// `&self`.
pub trait Connection: Send + Sync {
    /// Deliver all messages as one batch.
    fn send_batch(&self, messages: Vec<ProducerMessage>) -> Result<(), TransportError>;

    /// Release the connection.
    fn close(&self) -> Result<(), TransportError>;
}
