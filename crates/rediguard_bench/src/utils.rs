//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use rediguard_core::{Client, ClientConfig, ManualClock, Value};
use rediguard_store::{InMemoryServer, MemoryConnector};
use std::sync::Arc;

/// Generate random alphanumeric text of the specified length.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate `count` distinct key names.
pub fn key_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("bench:key:{i}")).collect()
}

/// A record-like map value with `fields` text fields of `field_len` bytes.
pub fn record(fields: usize, field_len: usize) -> Value {
    Value::map((0..fields).map(|i| (format!("field_{i}"), Value::Text(random_text(field_len)))))
}

/// A client over a fresh in-memory server, with a fixed clock.
pub fn memory_client(prefix: &str) -> Client {
    let config = ClientConfig::default().with_prefix(prefix);
    Client::with_clock(
        config,
        MemoryConnector::new(InMemoryServer::new()),
        Arc::new(ManualClock::new(1_700_000_000)),
    )
    .expect("in-memory client connects")
}
