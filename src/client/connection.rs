//! Lazily established, shared transport connection.

use std::{fmt, sync::Arc};

use log::debug;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::transport::{Connection, Connector, TransportConfig, TransportError};

/// Owns the single transport connection of a client.
///
/// Publishers share the read lock. The first of them to find the slot empty
/// connects while the others wait on the same cell, so at most one connection
/// is established per client. A failed connect leaves the cell empty and the
/// next caller tries again. [`close`](Self::close) takes the write lock,
/// waiting for in-flight lookups, and empties the slot.
pub(crate) struct ConnectionManager {
    connector: Arc<dyn Connector>,
    brokers: Vec<String>,
    config: TransportConfig,
    slot: RwLock<OnceCell<Arc<dyn Connection>>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        brokers: Vec<String>,
        config: TransportConfig,
    ) -> Self {
        Self {
            connector,
            brokers,
            config,
            slot: RwLock::new(OnceCell::new()),
        }
    }

    pub(crate) fn brokers(&self) -> &[String] {
        &self.brokers
    }

    pub(crate) fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Return the current connection, establishing it on first use.
    pub(crate) fn get(&self) -> Result<Arc<dyn Connection>, TransportError> {
        let slot = self.slot.read();
        slot.get_or_try_init(|| self.establish()).map(Arc::clone)
    }

    fn establish(&self) -> Result<Arc<dyn Connection>, TransportError> {
        debug!("cloudlog: connecting to {:?}", self.brokers);
        let connection = self.connector.connect(&self.brokers, &self.config)?;
        debug!("cloudlog: connection established");
        Ok(Arc::from(connection))
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.slot.read().get().is_some()
    }

    /// Close and forget the current connection. A no-op when unconnected.
    pub(crate) fn close(&self) -> Result<(), TransportError> {
        let mut slot = self.slot.write();
        let Some(connection) = slot.take() else {
            return Ok(());
        };
        debug!("cloudlog: closing connection");
        connection.close()
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("brokers", &self.brokers)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
