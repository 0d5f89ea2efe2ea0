//! TLS material used to secure broker connections.

use std::fmt;

use openssl::{
    error::ErrorStack,
    pkey::{PKey, Private},
    ssl::{SslConnector, SslMethod, SslVersion},
    x509::{X509, store::X509StoreBuilder},
};
use thiserror::Error;

/// Lowest TLS protocol version negotiated with brokers.
pub const MINIMUM_TLS_VERSION: SslVersion = SslVersion::TLS1_2;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Certificate or key material that could not be used.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("malformed PEM: {0}")]
    Pem(#[from] pem::PemError),
    #[error(transparent)]
    OpenSsl(#[from] ErrorStack),
    #[error("no certificate found in PEM data")]
    NoCertificate,
    #[error("private key does not match the certificate")]
    KeyMismatch,
}

/// Decode every `CERTIFICATE` block in a PEM bundle. Blocks with other tags
/// are skipped; a block that does not hold a valid certificate fails the
/// whole bundle.
pub fn certificates_from_pem(pem: &[u8]) -> Result<Vec<X509>, TlsError> {
    pem::parse_many(pem)?
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_TAG)
        .map(|block| X509::from_der(block.contents()).map_err(TlsError::from))
        .collect()
}

/// Certificate chain and private key presented for mutual TLS.
#[derive(Clone)]
pub struct ClientIdentity {
    certificate: X509,
    chain: Vec<X509>,
    key: PKey<Private>,
}

impl ClientIdentity {
    /// Load a leaf certificate, optionally followed by intermediates, and the
    /// matching private key. The key may be PKCS#8, PKCS#1 or SEC1.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TlsError> {
        let mut certs = certificates_from_pem(cert_pem)?.into_iter();
        let certificate = certs.next().ok_or(TlsError::NoCertificate)?;
        let key = PKey::private_key_from_pem(key_pem)?;
        if !key.public_eq(&*certificate.public_key()?) {
            return Err(TlsError::KeyMismatch);
        }
        Ok(Self {
            certificate,
            chain: certs.collect(),
            key,
        })
    }

    /// Intermediate certificates sent after the leaf.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("chain", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Trusted roots and client identity for the transport.
///
/// Without a root pool the platform trust store is used. Once a pool exists
/// it replaces the platform roots.
#[derive(Clone)]
pub struct TlsConfig {
    root_certificates: Option<Vec<X509>>,
    identities: Vec<ClientIdentity>,
    verify_hostname: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            root_certificates: None,
            identities: Vec::new(),
            verify_hostname: true,
        }
    }
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every certificate in the PEM bundle to the root pool, creating
    /// the pool if needed. Returns `false` when no certificate could be
    /// parsed.
    pub fn append_certs_from_pem(&mut self, pem: &[u8]) -> bool {
        let parsed = certificates_from_pem(pem).unwrap_or_default();
        let pool = self.root_certificates.get_or_insert_with(Vec::new);
        let appended = !parsed.is_empty();
        pool.extend(parsed);
        appended
    }

    /// Number of certificates in the root pool, or `None` without a pool.
    pub fn root_certificate_count(&self) -> Option<usize> {
        self.root_certificates.as_ref().map(Vec::len)
    }

    /// Replace the client identities presented for mutual TLS.
    ///
    /// Only the first identity is offered during the handshake.
    pub fn set_identities(&mut self, identities: Vec<ClientIdentity>) {
        self.identities = identities;
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Check broker certificates against the broker host name. On by
    /// default.
    pub fn with_hostname_verification(mut self, verify: bool) -> Self {
        self.verify_hostname = verify;
        self
    }

    pub fn verifies_hostname(&self) -> bool {
        self.verify_hostname
    }

    /// Build a connector enforcing [`MINIMUM_TLS_VERSION`].
    pub fn connector(&self) -> Result<SslConnector, ErrorStack> {
        let mut builder = SslConnector::builder(SslMethod::tls())?;
        builder.set_min_proto_version(Some(MINIMUM_TLS_VERSION))?;
        if let Some(roots) = &self.root_certificates {
            let mut store = X509StoreBuilder::new()?;
            for cert in roots {
                store.add_cert(cert.clone())?;
            }
            builder.set_cert_store(store.build());
        }
        if let Some(identity) = self.identities.first() {
            builder.set_certificate(&identity.certificate)?;
            for cert in &identity.chain {
                builder.add_extra_chain_cert(cert.clone())?;
            }
            builder.set_private_key(&identity.key)?;
            builder.check_private_key()?;
        }
        Ok(builder.build())
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("root_certificates", &self.root_certificate_count())
            .field("identities", &self.identities.len())
            .field("verify_hostname", &self.verify_hostname)
            .finish()
    }
}
