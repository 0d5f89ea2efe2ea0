//! Fixtures shared by the integration tests: certificate material and a
//! client wired to the in-memory recording transport.

use cloudlog::{CloudLog, options, testing::RecordingConnector};
use rstest::fixture;

/// Self-signed certificate for `localhost` and `127.0.0.1`.
pub const CERT_PEM: &[u8] = include_bytes!("../fixtures/broker-cert.pem");
/// PKCS#8 private key matching [`CERT_PEM`].
pub const KEY_PEM: &[u8] = include_bytes!("../fixtures/broker-key.pem");

#[fixture]
pub fn connector() -> RecordingConnector {
    RecordingConnector::new()
}

/// Client for `testindex` publishing through `connector`.
pub fn client_with(connector: &RecordingConnector) -> CloudLog {
    CloudLog::new(
        "testindex",
        [
            options::connector(connector.clone()),
            options::source_host("integration-host"),
        ],
    )
    .expect("valid client")
}
