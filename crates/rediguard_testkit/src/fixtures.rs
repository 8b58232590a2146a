//! Test fixtures and client helpers.
//!
//! Provides clients wired to an in-process server and a manual clock, so
//! tests control both the store and the passage of time.

use rediguard_core::{Client, ClientConfig, LockConfig, ManualClock, ReconnectPolicy};
use rediguard_store::{InMemoryServer, MemoryConnector};
use std::sync::Arc;
use std::time::Duration;

/// Epoch second the manual clock starts at.
pub const TEST_EPOCH: u64 = 1_700_000_000;

/// A client over an in-memory server with a manual clock.
pub struct TestClient {
    /// The client instance.
    pub client: Client,
    /// The server behind it.
    pub server: InMemoryServer,
    /// The clock used for lock timestamps.
    pub clock: ManualClock,
}

impl TestClient {
    /// Creates a client with prefix `test_` and fast reconnects.
    pub fn new() -> Self {
        Self::with_config(test_config("test_"))
    }

    /// Creates a client with the given prefix.
    pub fn with_prefix(prefix: &str) -> Self {
        Self::with_config(test_config(prefix))
    }

    /// Creates a client from an explicit configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let server = InMemoryServer::new();
        let clock = ManualClock::new(TEST_EPOCH);
        let client = connect(&server, &clock, config);
        Self {
            client,
            server,
            clock,
        }
    }

    /// Opens another client on the same server and clock.
    pub fn peer(&self) -> Client {
        connect(&self.server, &self.clock, self.client.config().clone())
    }

    /// Opens another client on the same server and clock with a different
    /// prefix.
    pub fn peer_with_prefix(&self, prefix: &str) -> Client {
        let config = self.client.config().clone().with_prefix(prefix);
        connect(&self.server, &self.clock, config)
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Configuration used by the fixtures: quick reconnect pauses and lock
/// records without store-side expiry, so only the manual clock ages them.
pub fn test_config(prefix: &str) -> ClientConfig {
    ClientConfig::default()
        .with_prefix(prefix)
        .with_reconnect(ReconnectPolicy::new(3, Duration::from_millis(5)))
        .with_lock(LockConfig::default().with_key_expiry(false))
}

fn connect(server: &InMemoryServer, clock: &ManualClock, config: ClientConfig) -> Client {
    Client::with_clock(
        config,
        MemoryConnector::new(server.clone()),
        Arc::new(clock.clone()),
    )
    .expect("Failed to connect test client")
}

/// Runs a test with a fresh [`TestClient`].
///
/// # Example
///
/// ```rust
/// use rediguard_testkit::with_test_client;
///
/// with_test_client(|t| {
///     t.set("name", "zhangsan", None).unwrap();
///     assert!(t.lock("job", 10).unwrap());
/// });
/// ```
pub fn with_test_client<F, R>(f: F) -> R
where
    F: FnOnce(&TestClient) -> R,
{
    let test_client = TestClient::new();
    f(&test_client)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A client with `count` string keys `key_0..key_{count-1}` holding
    /// their index.
    pub fn populated_client(count: usize) -> TestClient {
        let test_client = TestClient::new();
        for i in 0..count {
            test_client
                .set(&format!("key_{i}"), i as i64, None)
                .expect("Failed to populate key");
        }
        test_client
    }

    /// A client holding `count` locks named `lock_0..` with the given TTL.
    pub fn client_with_locks(count: usize, ttl_secs: u64) -> TestClient {
        let test_client = TestClient::new();
        for i in 0..count {
            let acquired = test_client
                .lock(&format!("lock_{i}"), ttl_secs)
                .expect("Failed to take lock");
            assert!(acquired, "fresh lock should be free");
        }
        test_client
    }
}
