//! Transport tuning consumed by connectors.

use std::{fmt, time::Duration};

use super::tls::TlsConfig;

/// Default timeout for establishing broker connections.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for reads, including acknowledgements.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Default timeout for writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default TCP keep-alive period.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(10);
/// Default limit on in-flight requests per connection.
pub const DEFAULT_MAX_OPEN_REQUESTS: usize = 10;
/// Default number of times a failed batch is retried by the transport.
pub const DEFAULT_RETRY_MAX: usize = 10;
/// Default pause between transport retries.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);
/// Default maximum payload size of a single message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1_000_000;

/// Lowest broker protocol version the client will speak.
pub const MINIMUM_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V0_10_2_0;

/// Acknowledgement level requested from the brokers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequiredAcks {
    /// Do not wait for any acknowledgement.
    NoResponse,
    /// Wait for the partition leader only.
    WaitForLocal,
    /// Wait for all in-sync replicas.
    #[default]
    WaitForAll,
}

/// Broker protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion([u8; 4]);

impl ProtocolVersion {
    pub const V0_10_2_0: Self = Self([0, 10, 2, 0]);
    pub const V1_0_0_0: Self = Self([1, 0, 0, 0]);
    pub const V2_0_0_0: Self = Self([2, 0, 0, 0]);

    pub const fn new(major: u8, minor: u8, patch: u8, build: u8) -> Self {
        Self([major, minor, patch, build])
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.0;
        write!(f, "{major}.{minor}.{patch}.{build}")
    }
}

/// Settings handed to [`Connector::connect`](super::Connector::connect).
///
/// The client always overwrites `tls_enabled`, `tls` and raises `version` to
/// [`MINIMUM_PROTOCOL_VERSION`] before use, so tuning cannot switch off
/// transport security.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub keep_alive: Duration,
    pub max_open_requests: usize,
    pub required_acks: RequiredAcks,
    /// Retries performed by the transport for a failed batch.
    pub retry_max: usize,
    pub retry_backoff: Duration,
    pub max_message_bytes: usize,
    pub version: ProtocolVersion,
    pub tls_enabled: bool,
    pub tls: TlsConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            keep_alive: DEFAULT_KEEP_ALIVE,
            max_open_requests: DEFAULT_MAX_OPEN_REQUESTS,
            required_acks: RequiredAcks::default(),
            retry_max: DEFAULT_RETRY_MAX,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            version: MINIMUM_PROTOCOL_VERSION,
            tls_enabled: true,
            tls: TlsConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Override the acknowledgement level.
    pub fn with_required_acks(mut self, acks: RequiredAcks) -> Self {
        self.required_acks = acks;
        self
    }

    /// Override the transport retry count.
    pub fn with_retry_max(mut self, retry_max: usize) -> Self {
        self.retry_max = retry_max;
        self
    }

    /// Override the dial, read and write timeouts.
    pub fn with_timeouts(mut self, dial: Duration, read: Duration, write: Duration) -> Self {
        self.dial_timeout = dial;
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    /// Enable TLS with `tls` and enforce the minimum protocol version.
    pub(crate) fn secure(mut self, tls: TlsConfig) -> Self {
        self.tls_enabled = true;
        self.tls = tls;
        self.version = self.version.max(MINIMUM_PROTOCOL_VERSION);
        self
    }
}
