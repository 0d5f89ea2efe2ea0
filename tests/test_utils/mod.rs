#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::{CERT_PEM, KEY_PEM, client_with, connector};
