//! Best-effort discovery of the local hostname.

use std::{env, fs};

const HOSTNAME_FILE: &str = "/etc/hostname";

/// Hostname used for `cloudlog_source_host` unless overridden.
///
/// Checks `HOSTNAME`, then `/etc/hostname`, then `COMPUTERNAME`. Returns an
/// empty string when none is available.
pub fn default_source_host() -> String {
    resolve_source_host(
        |key| env::var(key).ok(),
        || fs::read_to_string(HOSTNAME_FILE).ok(),
    )
}

fn resolve_source_host(
    env: impl Fn(&str) -> Option<String>,
    hostname_file: impl FnOnce() -> Option<String>,
) -> String {
    env("HOSTNAME")
        .and_then(non_empty)
        .or_else(|| hostname_file().and_then(non_empty))
        .or_else(|| env("COMPUTERNAME").and_then(non_empty))
        .unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
