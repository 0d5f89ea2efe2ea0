//! Configuration failures.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::transport::TlsError;

/// A single option failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The broker list was empty.
    #[error("brokers not specified")]
    BrokersNotSpecified,
    /// The supplied PEM data contained no usable CA certificate.
    #[error("CA certificate is invalid")]
    CaCertificateInvalid,
    /// No client certificate was supplied.
    #[error("client certificate is missing")]
    CertificateMissing,
    /// The client certificate or key could not be loaded.
    #[error("client certificate is invalid: {0}")]
    ClientCertificateInvalid(#[source] TlsError),
    /// A certificate file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Transport tuning was rejected.
    #[error("invalid transport configuration: {0}")]
    InvalidTransport(String),
}

/// Every failure reported while applying a set of options.
#[derive(Debug)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<ConfigError> {
        self.0
    }
}

impl From<Vec<ConfigError>> for ConfigErrors {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.0.as_slice() {
            return write!(f, "1 configuration error occurred: {only}");
        }
        write!(f, "{} configuration errors occurred:", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n\t* {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}
