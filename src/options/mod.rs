//! Composable client configuration.
//!
//! A [`ClientOption`] is a fallible step over [`ClientSettings`].
//! [`CloudLog::new`](crate::CloudLog::new) runs [`default_options`] first and
//! the caller's options afterwards, so the caller wins. Options for the same
//! concern overwrite each other. Every option runs even after an earlier one
//! failed; the failures are reported together as [`ConfigErrors`].

mod errors;
mod hostname;


use std::{fmt, fs, path::Path, sync::Arc};

use crate::{
    encoder::{AutomaticEncoder, EventEncoder},
    transport::{ClientIdentity, Connector, KafkaConnector, TlsConfig, TransportConfig},
};

pub use errors::{ConfigError, ConfigErrors};
pub use hostname::default_source_host;

/// Broker addresses used unless overridden.
pub const DEFAULT_BROKER_ADDRESSES: [&str; 3] = [
    "anx-bdp-broker0401.bdp.anexia-it.com:443",
    "anx-bdp-broker0402.bdp.anexia-it.com:443",
    "anx-bdp-broker0403.bdp.anexia-it.com:443",
];

/// Partially built client state that options mutate.
pub struct ClientSettings {
    pub(crate) index_name: String,
    pub(crate) brokers: Vec<String>,
    pub(crate) tls: TlsConfig,
    pub(crate) transport: TransportConfig,
    pub(crate) source_host: String,
    pub(crate) encoder: Arc<dyn EventEncoder>,
    pub(crate) connector: Arc<dyn Connector>,
}

impl ClientSettings {
    pub(crate) fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            brokers: Vec::new(),
            tls: TlsConfig::default(),
            transport: TransportConfig::default(),
            source_host: String::new(),
            encoder: Arc::new(AutomaticEncoder::new()),
            connector: Arc::new(KafkaConnector),
        }
    }

    /// Target index the client publishes to.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn brokers(&self) -> &[String] {
        &self.brokers
    }

    /// TLS configuration, mutable so custom options can extend it.
    pub fn tls_mut(&mut self) -> &mut TlsConfig {
        &mut self.tls
    }

    pub fn transport_mut(&mut self) -> &mut TransportConfig {
        &mut self.transport
    }

    pub fn source_host(&self) -> &str {
        &self.source_host
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("index_name", &self.index_name)
            .field("brokers", &self.brokers)
            .field("tls", &self.tls)
            .field("transport", &self.transport)
            .field("source_host", &self.source_host)
            .finish_non_exhaustive()
    }
}

type ApplyFn = dyn FnOnce(&mut ClientSettings) -> Result<(), ConfigError> + Send;

/// A single fallible configuration step, consumed when applied.
pub struct ClientOption(Box<ApplyFn>);

impl ClientOption {
    /// Wrap a custom configuration step.
    pub fn new<F>(apply: F) -> Self
    where
        F: FnOnce(&mut ClientSettings) -> Result<(), ConfigError> + Send + 'static,
    {
        Self(Box::new(apply))
    }

    pub(crate) fn apply(self, settings: &mut ClientSettings) -> Result<(), ConfigError> {
        (self.0)(settings)
    }
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientOption(..)")
    }
}

/// Apply `options` in order, collecting every failure.
pub(crate) fn apply_all(
    settings: &mut ClientSettings,
    options: impl IntoIterator<Item = ClientOption>,
) -> Result<(), ConfigErrors> {
    let errors: Vec<ConfigError> = options
        .into_iter()
        .filter_map(|option| option.apply(settings).err())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigErrors::from(errors))
    }
}

/// Freshly built defaults: broker list, automatic encoder, transport tuning,
/// Kafka connector and the local hostname as source host.
pub fn default_options() -> Vec<ClientOption> {
    vec![
        brokers(DEFAULT_BROKER_ADDRESSES),
        event_encoder(AutomaticEncoder::new()),
        transport_config(TransportConfig::default()),
        connector(KafkaConnector),
        source_host(default_source_host()),
    ]
}

/// Replace the broker list. Fails when `addresses` is empty.
pub fn brokers<I, S>(addresses: I) -> ClientOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
    ClientOption::new(move |settings| {
        if addresses.is_empty() {
            return Err(ConfigError::BrokersNotSpecified);
        }
        settings.brokers = addresses;
        Ok(())
    })
}

/// Replace the whole TLS configuration.
pub fn tls_config(tls: TlsConfig) -> ClientOption {
    ClientOption::new(move |settings| {
        settings.tls = tls;
        Ok(())
    })
}

/// Trust the CA certificates in `pem`, adding them to the root pool.
pub fn ca_certificate(pem: impl Into<Vec<u8>>) -> ClientOption {
    let pem = pem.into();
    ClientOption::new(move |settings| append_ca(settings, &pem))
}

/// Trust the CA certificates stored in the PEM file at `path`.
pub fn ca_certificate_file(path: impl AsRef<Path>) -> ClientOption {
    let path = path.as_ref().to_path_buf();
    ClientOption::new(move |settings| {
        let pem = read_file(&path)?;
        append_ca(settings, &pem)
    })
}

fn append_ca(settings: &mut ClientSettings, pem: &[u8]) -> Result<(), ConfigError> {
    if settings.tls.append_certs_from_pem(pem) {
        Ok(())
    } else {
        Err(ConfigError::CaCertificateInvalid)
    }
}

/// Present `identities` for mutual TLS. Fails when none are supplied.
pub fn client_certificates(identities: Vec<ClientIdentity>) -> ClientOption {
    ClientOption::new(move |settings| {
        if identities.is_empty() {
            return Err(ConfigError::CertificateMissing);
        }
        settings.tls.set_identities(identities);
        Ok(())
    })
}

/// Load a PEM certificate chain and its private key and present them for
/// mutual TLS.
pub fn client_certificate_file(
    cert_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> ClientOption {
    let cert_path = cert_path.as_ref().to_path_buf();
    let key_path = key_path.as_ref().to_path_buf();
    ClientOption::new(move |settings| {
        let cert = read_file(&cert_path)?;
        let key = read_file(&key_path)?;
        let identity = ClientIdentity::from_pem(&cert, &key)
            .map_err(ConfigError::ClientCertificateInvalid)?;
        client_certificates(vec![identity]).apply(settings)
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Use `encoder` instead of the automatic encoder.
pub fn event_encoder(encoder: impl EventEncoder + 'static) -> ClientOption {
    let encoder: Arc<dyn EventEncoder> = Arc::new(encoder);
    ClientOption::new(move |settings| {
        settings.encoder = encoder;
        Ok(())
    })
}

fn default_of<T: Default>(_: &T) -> T {
    T::default()
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == default_of(&$value) {
            Err(ConfigError::InvalidTransport(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

fn validate_transport(config: &TransportConfig) -> Result<(), ConfigError> {
    ensure_positive!(config.dial_timeout, "dial_timeout")?;
    ensure_positive!(config.read_timeout, "read_timeout")?;
    ensure_positive!(config.write_timeout, "write_timeout")?;
    ensure_positive!(config.max_open_requests, "max_open_requests")?;
    ensure_positive!(config.max_message_bytes, "max_message_bytes")?;
    Ok(())
}

/// Replace the transport tuning. TLS settings inside `config` are ignored;
/// the client always installs its own.
pub fn transport_config(config: TransportConfig) -> ClientOption {
    ClientOption::new(move |settings| {
        validate_transport(&config)?;
        settings.transport = config;
        Ok(())
    })
}

/// Use `connector` to establish transport connections.
pub fn connector(connector: impl Connector + 'static) -> ClientOption {
    let connector: Arc<dyn Connector> = Arc::new(connector);
    ClientOption::new(move |settings| {
        settings.connector = connector;
        Ok(())
    })
}

/// Override the `cloudlog_source_host` value.
pub fn source_host(hostname: impl Into<String>) -> ClientOption {
    let hostname = hostname.into();
    ClientOption::new(move |settings| {
        settings.source_host = hostname;
        Ok(())
    })
}
