//! Redis-backed store handles.

use crate::backend::{ConnectOptions, Connector, StoreClient};
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use redis::{Connection, ErrorKind, FromRedisValue, RedisError, ToRedisArgs};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

type SharedConnection = Arc<Mutex<Connection>>;

/// Process-wide persistent channels, keyed by persistent id and address.
fn persistent_channels() -> &'static Mutex<HashMap<String, SharedConnection>> {
    static CHANNELS: OnceLock<Mutex<HashMap<String, SharedConnection>>> = OnceLock::new();
    CHANNELS.get_or_init(|| Mutex::new(HashMap::new()))
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_connection_dropped()
            || err.is_io_error()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            return StoreError::Disconnected(err.to_string());
        }
        match (err.kind(), err.code()) {
            (_, Some("WRONGTYPE")) => StoreError::WrongType(err.to_string()),
            (ErrorKind::AuthenticationFailed, _) | (_, Some("NOAUTH" | "WRONGPASS")) => {
                StoreError::Auth(err.to_string())
            }
            _ if err.to_string().contains("not an integer") => StoreError::NotInteger,
            _ => StoreError::Server(err.to_string()),
        }
    }
}

/// Opens connections to a Redis server.
///
/// With [`ConnectOptions::persistent`] set, connections are registered in
/// a process-wide table keyed by [`ConnectOptions::persistent_id`] and
/// address. A later connect with the same key reuses the channel if it
/// still answers `PING`, otherwise it is replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisConnector;

impl RedisConnector {
    /// Creates a connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open(options: &ConnectOptions) -> StoreResult<Connection> {
        let url = format!("redis://{}/", options.address());
        let client = redis::Client::open(url)?;
        let conn = if options.timeout.is_zero() {
            client.get_connection()?
        } else {
            client.get_connection_with_timeout(options.timeout)?
        };
        Ok(conn)
    }

    fn open_persistent(options: &ConnectOptions) -> StoreResult<SharedConnection> {
        let id = format!("{}@{}", options.persistent_id(), options.address());
        let mut channels = persistent_channels().lock();
        if let Some(existing) = channels.get(&id) {
            let alive = redis::cmd("PING")
                .query::<String>(&mut *existing.lock())
                .is_ok();
            if alive {
                tracing::debug!(id = %id, "reusing persistent channel");
                return Ok(Arc::clone(existing));
            }
            tracing::debug!(id = %id, "persistent channel is dead, replacing");
        }
        let shared = Arc::new(Mutex::new(Self::open(options)?));
        channels.insert(id, Arc::clone(&shared));
        Ok(shared)
    }
}

impl Connector for RedisConnector {
    fn connect(&self, options: &ConnectOptions) -> StoreResult<Box<dyn StoreClient>> {
        let conn = if options.persistent {
            Self::open_persistent(options)?
        } else {
            Arc::new(Mutex::new(Self::open(options)?))
        };
        Ok(Box::new(RedisClient { conn }))
    }
}

/// A handle to a Redis connection.
pub struct RedisClient {
    conn: SharedConnection,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}

impl RedisClient {
    fn query<T: FromRedisValue>(&mut self, name: &str, args: impl ToRedisArgs) -> StoreResult<T> {
        let mut conn = self.conn.lock();
        Ok(redis::cmd(name).arg(args).query(&mut *conn)?)
    }
}

impl StoreClient for RedisClient {
    fn auth(&mut self, password: &str) -> StoreResult<()> {
        self.query("AUTH", password)
    }

    fn select(&mut self, db: u32) -> StoreResult<()> {
        self.query("SELECT", db)
    }

    fn get(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.query("GET", key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.query("SET", (key, value))
    }

    fn set_ex(&mut self, key: &str, value: &[u8], ttl_secs: u64) -> StoreResult<()> {
        self.query("SETEX", (key, ttl_secs, value))
    }

    fn set_nx(&mut self, key: &str, value: &[u8]) -> StoreResult<bool> {
        self.query("SETNX", (key, value))
    }

    fn del(&mut self, key: &str) -> StoreResult<u64> {
        self.query("DEL", key)
    }

    fn expire(&mut self, key: &str, ttl_secs: u64) -> StoreResult<bool> {
        self.query("EXPIRE", (key, ttl_secs))
    }

    fn incr_by(&mut self, key: &str, delta: i64) -> StoreResult<i64> {
        self.query("INCRBY", (key, delta))
    }

    fn keys(&mut self, pattern: &str) -> StoreResult<Vec<String>> {
        self.query("KEYS", pattern)
    }

    fn sadd(&mut self, key: &str, member: &[u8]) -> StoreResult<u64> {
        self.query("SADD", (key, member))
    }

    fn srem(&mut self, key: &str, member: &[u8]) -> StoreResult<u64> {
        self.query("SREM", (key, member))
    }

    fn smembers(&mut self, key: &str) -> StoreResult<Vec<Vec<u8>>> {
        self.query("SMEMBERS", key)
    }

    fn scard(&mut self, key: &str) -> StoreResult<u64> {
        self.query("SCARD", key)
    }

    fn sismember(&mut self, key: &str, member: &[u8]) -> StoreResult<bool> {
        self.query("SISMEMBER", (key, member))
    }

    fn lpush(&mut self, key: &str, value: &[u8]) -> StoreResult<u64> {
        self.query("LPUSH", (key, value))
    }

    fn rpush(&mut self, key: &str, value: &[u8]) -> StoreResult<u64> {
        self.query("RPUSH", (key, value))
    }

    fn lpop(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.query("LPOP", key)
    }

    fn rpop(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.query("RPOP", key)
    }

    fn llen(&mut self, key: &str) -> StoreResult<u64> {
        self.query("LLEN", key)
    }

    fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        self.query("LRANGE", (key, start, stop))
    }

    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<bool> {
        self.query("HSET", (key, field, value))
    }

    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.query("HGET", (key, field))
    }

    fn hdel(&mut self, key: &str, field: &str) -> StoreResult<u64> {
        self.query("HDEL", (key, field))
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let fields: BTreeMap<String, Vec<u8>> = self.query("HGETALL", key)?;
        Ok(fields.into_iter().collect())
    }

    fn publish(&mut self, channel: &str, message: &[u8]) -> StoreResult<u64> {
        self.query("PUBLISH", (channel, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_errors_are_disconnects() {
        let err = RedisError::from(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        assert!(StoreError::from(err).is_transient_disconnect());
    }

    #[test]
    fn response_errors_are_not_transient() {
        let err = RedisError::from((ErrorKind::TypeError, "unexpected reply"));
        let mapped = StoreError::from(err);
        assert!(!mapped.is_transient_disconnect());
        assert!(matches!(mapped, StoreError::Server(_)));
    }

    #[test]
    fn authentication_errors_are_mapped() {
        let err = RedisError::from((ErrorKind::AuthenticationFailed, "invalid password"));
        assert!(matches!(StoreError::from(err), StoreError::Auth(_)));
    }

    #[test]
    fn unreachable_server_is_a_disconnect() {
        // Port 1 on localhost is reserved and closed on any sane host.
        let options = ConnectOptions::new("127.0.0.1", 1)
            .with_timeout(std::time::Duration::from_millis(200));
        let err = RedisConnector::new().connect(&options).err().unwrap();
        assert!(err.is_transient_disconnect());
    }
}
