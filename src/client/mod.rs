//! The publishing client.
//!
//! [`CloudLog`] turns application events into JSON envelopes and hands them
//! to the transport as one batch per call. Every envelope carries three
//! fields added by the client:
//!
//! - `timestamp`: epoch milliseconds. Events without one get the time of the
//!   publish call; events with one have it normalised, see
//!   [`normalize_timestamp`](crate::timestamp::normalize_timestamp).
//! - `cloudlog_source_host`: the configured source host.
//! - `cloudlog_client_type`: always [`CLIENT_TYPE`].
//!
//! A batch is atomic from the caller's point of view: if any event fails to
//! encode, nothing is sent.

mod connection;

#[cfg(test)]
mod tests;

use std::{fmt, path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    encoder::{Envelope, EventEncoder},
    error::{CloudLogError, MarshalError},
    event::{Event, flatten_single_sequence},
    options::{self, ClientOption, ClientSettings, default_options},
    timestamp::{epoch_millis, normalize_timestamp},
    transport::{ProducerMessage, TransportConfig},
};

use connection::ConnectionManager;

/// Envelope field holding the event time in epoch milliseconds.
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Envelope field holding the publishing host.
pub const SOURCE_HOST_FIELD: &str = "cloudlog_source_host";
/// Envelope field identifying the client implementation.
pub const CLIENT_TYPE_FIELD: &str = "cloudlog_client_type";
/// Value of [`CLIENT_TYPE_FIELD`], kept stable for the ingest pipeline.
pub const CLIENT_TYPE: &str = "go-client-kafka";

/// Single-event publishing seam.
///
/// Log front-ends depend on this rather than on [`CloudLog`] so they can be
/// driven by a mock in tests.
pub trait PushEvent: Send + Sync {
    fn push_event(&self, event: Event) -> Result<(), CloudLogError>;
}

/// Client publishing events to one CloudLog index.
///
/// Safe to share between threads. The transport connection is opened on the
/// first publish and reused until [`close`](Self::close).
pub struct CloudLog {
    index_name: String,
    source_host: String,
    encoder: Arc<dyn EventEncoder>,
    connection: ConnectionManager,
}

impl CloudLog {
    /// Build a client for `index_name`.
    ///
    /// The defaults from [`default_options`] run first, then `options` in
    /// order. Every option is applied; all failures are returned together.
    /// Transport security is always enabled regardless of the options given.
    ///
    /// # Errors
    ///
    /// [`CloudLogError::IndexNotDefined`] when `index_name` is empty, before
    /// any option runs. [`CloudLogError::Config`] when any option fails.
    pub fn new<I>(index_name: impl Into<String>, options: I) -> Result<Self, CloudLogError>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let index_name = index_name.into();
        if index_name.is_empty() {
            return Err(CloudLogError::IndexNotDefined);
        }
        let mut settings = ClientSettings::new(index_name);
        options::apply_all(&mut settings, default_options().into_iter().chain(options))?;
        Ok(Self::from_settings(settings))
    }

    /// Build a client trusting the CA in `ca_file` and authenticating with
    /// the certificate and PKCS#8 key in `cert_file` and `key_file`.
    pub fn with_certificate_files(
        index_name: impl Into<String>,
        ca_file: impl AsRef<Path>,
        cert_file: impl AsRef<Path>,
        key_file: impl AsRef<Path>,
    ) -> Result<Self, CloudLogError> {
        Self::new(
            index_name,
            [
                options::ca_certificate_file(ca_file),
                options::client_certificate_file(cert_file, key_file),
            ],
        )
    }

    fn from_settings(settings: ClientSettings) -> Self {
        let ClientSettings {
            index_name,
            brokers,
            tls,
            transport,
            source_host,
            encoder,
            connector,
        } = settings;
        Self {
            index_name,
            source_host,
            encoder,
            connection: ConnectionManager::new(connector, brokers, transport.secure(tls)),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn brokers(&self) -> &[String] {
        self.connection.brokers()
    }

    pub fn source_host(&self) -> &str {
        &self.source_host
    }

    /// Transport configuration handed to the connector, TLS included.
    pub fn transport_config(&self) -> &TransportConfig {
        self.connection.config()
    }

    /// Whether a transport connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Publish `events` as one batch.
    ///
    /// An empty batch succeeds without connecting. A single argument that is
    /// itself a sequence is unwrapped one level, so `push_events([events])`
    /// and `push_events(events)` are equivalent.
    ///
    /// # Errors
    ///
    /// The first encoding or serialisation failure aborts the batch before
    /// anything is sent. Transport failures are returned as reported by the
    /// connection.
    pub fn push_events<I>(&self, events: I) -> Result<(), CloudLogError>
    where
        I: IntoIterator,
        I::Item: Into<Event>,
    {
        let events = flatten_single_sequence(events.into_iter().map(Into::into).collect());
        if events.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let messages = events
            .iter()
            .map(|event| self.build_message(event, now))
            .collect::<Result<Vec<_>, _>>()?;

        let connection = self.connection.get()?;
        connection.send_batch(messages)?;
        Ok(())
    }

    /// Publish a single event.
    pub fn push_event(&self, event: impl Into<Event>) -> Result<(), CloudLogError> {
        self.push_events([event.into()])
    }

    /// Close the transport connection. Closing an unconnected client is a
    /// no-op; a later publish reconnects.
    ///
    /// Closing while another thread is mid-send is not coordinated beyond
    /// the connection lock; the outcome of that send is up to the transport.
    pub fn close(&self) -> Result<(), CloudLogError> {
        self.connection.close()?;
        Ok(())
    }

    fn build_message(
        &self,
        event: &Event,
        now: DateTime<Utc>,
    ) -> Result<ProducerMessage, CloudLogError> {
        let envelope = self.envelope(event, now)?;
        let payload = match serde_json::to_vec(&envelope) {
            Ok(payload) => payload,
            Err(source) => return Err(MarshalError::new(envelope, source).into()),
        };
        Ok(ProducerMessage {
            topic: self.index_name.clone(),
            payload,
            timestamp: now,
        })
    }

    fn envelope(&self, event: &Event, now: DateTime<Utc>) -> Result<Envelope, CloudLogError> {
        let mut envelope = self.encoder.encode_event(event)?;
        let timestamp = match envelope.remove(TIMESTAMP_FIELD) {
            Some(existing) => normalize_timestamp(existing),
            None => Value::from(epoch_millis(&now)),
        };
        envelope.insert(TIMESTAMP_FIELD.to_owned(), timestamp);
        envelope.insert(
            SOURCE_HOST_FIELD.to_owned(),
            Value::from(self.source_host.as_str()),
        );
        envelope.insert(CLIENT_TYPE_FIELD.to_owned(), Value::from(CLIENT_TYPE));
        Ok(envelope)
    }
}

impl PushEvent for CloudLog {
    fn push_event(&self, event: Event) -> Result<(), CloudLogError> {
        CloudLog::push_event(self, event)
    }
}

impl<T: PushEvent + ?Sized> PushEvent for Arc<T> {
    fn push_event(&self, event: Event) -> Result<(), CloudLogError> {
        (**self).push_event(event)
    }
}

impl Drop for CloudLog {
    fn drop(&mut self) {
        if let Err(err) = self.connection.close() {
            log::debug!("cloudlog: error closing connection on drop: {err}");
        }
    }
}

impl fmt::Debug for CloudLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudLog")
            .field("index_name", &self.index_name)
            .field("source_host", &self.source_host)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
