//! Bridge for the `log` crate.
//!
//! [`CloudLogLogger`] implements `log::Log`, turning each record into a
//! [`Document`] whose fields carry the record target as `module` and the
//! call site as `caller`. Records are published in the background through
//! an [`EventForwarder`].

use log::{LevelFilter, Metadata, Record};
use thiserror::Error;

use crate::{client::PushEvent, event::Event};

use super::{
    document::{Document, MODULE_FIELD},
    forwarder::{EventForwarder, ForwarderConfig},
    is_internal,
};

/// `log::Log` implementation publishing to CloudLog.
#[derive(Debug)]
pub struct CloudLogLogger {
    forwarder: EventForwarder,
    level: LevelFilter,
}

impl CloudLogLogger {
    /// Forward records at `Info` and above to `client`.
    pub fn new(client: impl PushEvent + 'static) -> Self {
        Self::with_config(client, ForwarderConfig::default())
    }

    pub fn with_config(client: impl PushEvent + 'static, config: ForwarderConfig) -> Self {
        Self {
            forwarder: EventForwarder::with_config(client, config),
            level: LevelFilter::Info,
        }
    }

    /// Only forward records at `level` or more severe.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn forwarder(&self) -> &EventForwarder {
        &self.forwarder
    }
}

fn document_from_record(record: &Record<'_>) -> Document {
    Document::new(record.args().to_string(), record.level().as_str())
        .with_field(MODULE_FIELD, record.target())
        .with_caller(record.file(), record.line())
}

impl log::Log for CloudLogLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && !is_internal(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let document = document_from_record(record);
        // Drops are counted and reported by the forwarder.
        let _ = self.forwarder.forward(Event::from(document));
    }

    fn flush(&self) {
        self.forwarder.flush();
    }
}

/// Installing the global logger failed because one is already set.
#[derive(Debug, Error)]
#[error("a global logger is already installed")]
pub struct InstallError;

/// Install `logger` as the process-wide `log` logger and raise the global
/// max level to the logger's level.
///
/// Succeeds at most once per process. When another logger is already set,
/// `logger` is dropped, which drains its queue and stops its worker.
pub fn install_global_logger(logger: CloudLogLogger) -> Result<(), InstallError> {
    let level = logger.level();
    log::set_boxed_logger(Box::new(logger)).map_err(|_| InstallError)?;
    log::set_max_level(level);
    Ok(())
}
