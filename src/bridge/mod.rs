//! Adapters publishing application log output through a [`CloudLog`] client.
//!
//! Log front-ends turn each entry into a [`Document`] and hand it to an
//! [`EventForwarder`], which publishes from a background thread so that
//! logging never waits on the network.
//!
//! [`CloudLog`]: crate::CloudLog

mod document;
mod forwarder;
#[cfg(feature = "log-compat")]
mod log_compat;
#[cfg(feature = "tracing-compat")]
mod tracing_layer;

pub use document::Document;
pub use forwarder::{EventForwarder, ForwardError, ForwarderConfig};
#[cfg(feature = "log-compat")]
pub use log_compat::{CloudLogLogger, InstallError, install_global_logger};
#[cfg(feature = "tracing-compat")]
pub use tracing_layer::CloudLogLayer;

/// Target prefix of records emitted by this crate. Adapters never forward
/// them, since publishing them would log again.
#[cfg_attr(not(any(feature = "log-compat", feature = "tracing-compat")), allow(dead_code))]
const INTERNAL_TARGET: &str = "cloudlog";

#[cfg_attr(not(any(feature = "log-compat", feature = "tracing-compat")), allow(dead_code))]
fn is_internal(target: &str) -> bool {
    target
        .strip_prefix(INTERNAL_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}
