//! Store handle and connector trait definitions.

use crate::error::StoreResult;
use std::time::Duration;

/// A live connection handle to a key-value store.
///
/// Handles are **dumb pipes**: keys and values are passed through exactly
/// as given. Namespacing, value encoding and retry policy are the caller's
/// business.
///
/// # Invariants
///
/// - `set_nx` is atomic at the store: of two concurrent calls for the same
///   absent key, exactly one returns `true`
/// - Every method reports a lost connection as
///   [`StoreError::Disconnected`](crate::StoreError::Disconnected) and
///   nothing else as such
/// - A handle is owned by one caller at a time (`Send`, not `Sync`)
///
/// # Implementors
///
/// - [`super::MemoryClient`] - In-process store for tests
/// - `RedisClient` - Redis connection (feature `redis`)
pub trait StoreClient: Send {
    /// Authenticates the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Auth`](crate::StoreError::Auth) if the
    /// password is rejected.
    fn auth(&mut self, password: &str) -> StoreResult<()>;

    /// Selects the numbered database for subsequent commands.
    fn select(&mut self, db: u32) -> StoreResult<()>;

    /// Reads a string value. Returns `None` if the key does not exist.
    fn get(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a string value with no expiry.
    fn set(&mut self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Writes a string value that expires after `ttl_secs` seconds.
    fn set_ex(&mut self, key: &str, value: &[u8], ttl_secs: u64) -> StoreResult<()>;

    /// Writes a value only if the key does not exist.
    ///
    /// Returns true if the value was written.
    fn set_nx(&mut self, key: &str, value: &[u8]) -> StoreResult<bool>;

    /// Deletes a key. Returns the number of keys removed (0 or 1).
    fn del(&mut self, key: &str) -> StoreResult<u64>;

    /// Sets a time-to-live on an existing key.
    ///
    /// Returns false if the key does not exist.
    fn expire(&mut self, key: &str, ttl_secs: u64) -> StoreResult<bool>;

    /// Adds `delta` to an integer value, creating it at 0 if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInteger`](crate::StoreError::NotInteger) if
    /// the stored value is not an integer.
    fn incr_by(&mut self, key: &str, delta: i64) -> StoreResult<i64>;

    /// Lists keys matching a glob pattern.
    fn keys(&mut self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Adds a member to a set. Returns the number of members added.
    fn sadd(&mut self, key: &str, member: &[u8]) -> StoreResult<u64>;

    /// Removes a member from a set. Returns the number of members removed.
    fn srem(&mut self, key: &str, member: &[u8]) -> StoreResult<u64>;

    /// Returns all members of a set, in no particular order.
    fn smembers(&mut self, key: &str) -> StoreResult<Vec<Vec<u8>>>;

    /// Returns the number of members in a set.
    fn scard(&mut self, key: &str) -> StoreResult<u64>;

    /// Returns true if `member` is in the set.
    fn sismember(&mut self, key: &str, member: &[u8]) -> StoreResult<bool>;

    /// Pushes onto the head of a list. Returns the new length.
    fn lpush(&mut self, key: &str, value: &[u8]) -> StoreResult<u64>;

    /// Pushes onto the tail of a list. Returns the new length.
    fn rpush(&mut self, key: &str, value: &[u8]) -> StoreResult<u64>;

    /// Pops from the head of a list.
    fn lpop(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Pops from the tail of a list.
    fn rpop(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Returns the length of a list.
    fn llen(&mut self, key: &str) -> StoreResult<u64>;

    /// Returns list elements between `start` and `stop` inclusive.
    ///
    /// Negative indices count from the tail, as in Redis.
    fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>>;

    /// Sets a hash field. Returns true if the field is new.
    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<bool>;

    /// Reads a hash field.
    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Deletes a hash field. Returns the number of fields removed.
    fn hdel(&mut self, key: &str, field: &str) -> StoreResult<u64>;

    /// Returns all fields and values of a hash.
    fn hgetall(&mut self, key: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Publishes a message. Returns the number of receiving subscribers.
    fn publish(&mut self, channel: &str, message: &[u8]) -> StoreResult<u64>;
}

/// Options used to open a store connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connect timeout (`Duration::ZERO` means no timeout).
    pub timeout: Duration,
    /// Reuse a process-wide channel keyed by [`persistent_id`](Self::persistent_id).
    pub persistent: bool,
    /// Database index, used to derive the persistent channel id.
    pub db: u32,
}

impl ConnectOptions {
    /// Creates options for a plain (non-persistent) connection.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::ZERO,
            persistent: false,
            db: 0,
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables persistent channel reuse.
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets the database index.
    #[must_use]
    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    /// Identifier under which a persistent channel is registered.
    pub fn persistent_id(&self) -> String {
        format!("persistent_id_{}", self.db)
    }

    /// Returns `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Opens new store handles.
///
/// A connector only establishes the transport; authentication and
/// database selection are issued on the returned handle by the caller.
pub trait Connector: Send + Sync {
    /// Opens a handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`](crate::StoreError::Disconnected)
    /// if the server cannot be reached.
    fn connect(&self, options: &ConnectOptions) -> StoreResult<Box<dyn StoreClient>>;
}
