//! Connection lifecycle is reported through the `log` facade.

mod test_utils;

use cloudlog::testing::RecordingConnector;
use logtest::Logger;
use std::sync::Once;
use serial_test::serial;
use test_utils::client_with;

/// `Logger::start` installs the global logger and may only run once per
/// process; later tests reuse the installed logger.
fn start_logger() -> Logger {
    static START: Once = Once::new();
    START.call_once(|| {
        Logger::start();
    });
    Logger
}

/// Messages logged by this crate since the last call, oldest first.
fn drain_crate_messages(logger: &mut Logger) -> Vec<String> {
    let mut messages = Vec::new();
    while let Some(record) = logger.pop() {
        if record.target().starts_with("cloudlog") {
            assert_eq!(record.level(), log::Level::Debug);
            messages.push(record.args().to_owned());
        }
    }
    messages
}

#[test]
#[serial]
fn connection_lifecycle_is_logged_at_debug() {
    let mut logger = start_logger();
    drain_crate_messages(&mut logger);

    let connector = RecordingConnector::new();
    let client = client_with(&connector);
    client.push_event("hello").expect("published");
    client.close().expect("closed");

    let messages = drain_crate_messages(&mut logger);
    assert!(messages.iter().any(|m| m.contains("connecting to")));
    assert!(messages.iter().any(|m| m.contains("connection established")));
    assert!(messages.iter().any(|m| m.contains("closing connection")));
}

#[test]
#[serial]
fn failed_connect_is_not_logged_as_established() {
    let mut logger = start_logger();
    drain_crate_messages(&mut logger);

    let connector = RecordingConnector::new().failing_connects(1);
    let client = client_with(&connector);
    assert!(client.push_event("lost").is_err());

    let messages = drain_crate_messages(&mut logger);
    assert!(messages.iter().any(|m| m.contains("connecting to")));
    assert!(!messages.iter().any(|m| m.contains("connection established")));
}
