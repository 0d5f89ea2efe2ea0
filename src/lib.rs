//! Client library for publishing structured events to CloudLog.
//!
//! A [`CloudLog`] client encodes application events into JSON envelopes and
//! delivers them in batches to the index it was created for:
//!
//! ```no_run
//! use cloudlog::{CloudLog, options};
//!
//! # fn main() -> Result<(), cloudlog::CloudLogError> {
//! let client = CloudLog::new(
//!     "my-index",
//!     [
//!         options::ca_certificate_file("ca.pem"),
//!         options::client_certificate_file("client.pem", "client.key"),
//!     ],
//! )?;
//! client.push_event("service started")?;
//! client.push_events([
//!     serde_json::json!({"message": "user login", "user": "alice"}),
//!     serde_json::json!({"message": "user logout", "user": "alice"}),
//! ])?;
//! client.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`bridge`] module connects `log` and `tracing` to a client.

pub mod bridge;
mod client;
pub mod encoder;
mod error;
pub mod event;
pub mod options;
mod rate_limited_warner;
pub mod timestamp;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{
    CLIENT_TYPE, CLIENT_TYPE_FIELD, CloudLog, PushEvent, SOURCE_HOST_FIELD, TIMESTAMP_FIELD,
};
pub use encoder::{AutomaticEncoder, Envelope, EventEncoder, SimpleEncoder, StructEncoder};
pub use error::{CloudLogError, EventEncodingError, MarshalError};
pub use event::{Event, Record, SelfEncoding};
pub use options::{ClientOption, ConfigError, ConfigErrors};
pub use transport::{TlsConfig, TransportConfig, TransportError};
