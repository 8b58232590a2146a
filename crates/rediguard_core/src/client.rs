//! The client facade.

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::dispatch::{CancellationToken, DispatchStats, Dispatcher};
use crate::error::{CoreError, CoreResult};
use crate::keys::KeyCodec;
use crate::lock::{LockManager, LockState};
use rediguard_codec::{decode, encode, try_decode, Value};
use rediguard_store::{Connector, StoreError};
use std::sync::Arc;

/// A resilient, namespaced key-value client.
///
/// Every key argument is a logical name; the configured prefix is applied
/// before it reaches the store. Values go through the codec: scalars are
/// stored as plain bytes, composites as tagged CBOR.
///
/// `Client` is `Send + Sync`. Calls from several threads are serialized on
/// the single underlying connection.
///
/// # Example
///
/// ```rust
/// use rediguard_core::{Client, ClientConfig, Value};
/// use rediguard_store::{InMemoryServer, MemoryConnector};
///
/// let server = InMemoryServer::new();
/// let client = Client::new(ClientConfig::default(), MemoryConnector::new(server)).unwrap();
///
/// client.set("money", 100i64, None).unwrap();
/// assert_eq!(client.inc("money", 5).unwrap(), 105);
/// assert_eq!(client.get("age", 20i64).unwrap(), Value::Integer(20));
/// ```
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    keys: KeyCodec,
    dispatcher: Dispatcher,
    locks: LockManager,
}

impl Client {
    /// Creates a client and connects.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Configuration`] if the configuration is invalid
    /// - [`CoreError::Connection`] if the first connection fails
    pub fn new(config: ClientConfig, connector: impl Connector + 'static) -> CoreResult<Self> {
        Self::with_clock(config, connector, Arc::new(SystemClock))
    }

    /// Creates a client with an explicit clock for lock timestamps.
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`].
    pub fn with_clock(
        config: ClientConfig,
        connector: impl Connector + 'static,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let keys = KeyCodec::new(config.prefix.clone());
        let manager = ConnectionManager::new(&config, Arc::new(connector));
        let dispatcher = Dispatcher::new(manager, config.reconnect);
        if let Err(e) = dispatcher.connect() {
            tracing::warn!(
                host = %config.host,
                port = config.port,
                error = %e,
                "initial connection failed"
            );
            return Err(e);
        }
        tracing::info!(host = %config.host, port = config.port, db = config.db, "client connected");
        let locks = LockManager::new(keys.clone(), config.lock, clock);
        Ok(Self {
            config,
            keys,
            dispatcher,
            locks,
        })
    }

    /// Creates a client talking to a Redis server.
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`].
    #[cfg(feature = "redis")]
    pub fn connect_redis(config: ClientConfig) -> CoreResult<Self> {
        Self::new(config, rediguard_store::RedisConnector::new())
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dispatcher counters.
    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Replaces the connection with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] without retrying.
    pub fn reconnect(&self) -> CoreResult<()> {
        self.dispatcher.connect()
    }

    /// Bounds reconnect waits with `token`, or removes the bound.
    pub fn set_cancellation(&self, token: Option<CancellationToken>) {
        self.dispatcher.set_cancellation(token);
    }


    /// Stores `value` under `name`.
    ///
    /// `ttl` is in seconds. `None` uses the configured default expiry and
    /// `Some(0)` stores without expiry.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn set(&self, name: &str, value: impl Into<Value>, ttl: Option<u64>) -> CoreResult<()> {
        let key = self.keys.physical(name);
        let bytes = encode(&value.into())?;
        match ttl.unwrap_or(self.config.default_expire) {
            0 => self.dispatcher.invoke("set", |h| h.set(&key, &bytes)),
            secs => self.dispatcher.invoke("setex", |h| h.set_ex(&key, &bytes, secs)),
        }
    }

    /// Reads `name`, returning `default` when it is absent or unreadable.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn get(&self, name: &str, default: impl Into<Value>) -> CoreResult<Value> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("get", |h| h.get(&key))?;
        Ok(decode(raw.as_deref(), default.into()))
    }

    /// Reads `name`, returning `None` when it is absent or holds a
    /// malformed tagged payload.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn get_opt(&self, name: &str) -> CoreResult<Option<Value>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("get", |h| h.get(&key))?;
        Ok(raw.and_then(|raw| decode_present(&raw)))
    }

    /// Adds `delta` to the integer at `name` and returns the result.
    ///
    /// # Errors
    ///
    /// [`CoreError::Store`] with [`StoreError::NotInteger`] when the value
    /// is not an integer.
    pub fn inc(&self, name: &str, delta: i64) -> CoreResult<i64> {
        let key = self.keys.physical(name);
        self.dispatcher.invoke("incrby", |h| h.incr_by(&key, delta))
    }

    /// Subtracts `delta` from the integer at `name` and returns the result.
    ///
    /// # Errors
    ///
    /// Same as [`Client::inc`].
    pub fn dec(&self, name: &str, delta: i64) -> CoreResult<i64> {
        self.inc(name, delta.saturating_neg())
    }

    /// Stores `value` only if `name` is absent.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn set_nx(&self, name: &str, value: impl Into<Value>) -> CoreResult<bool> {
        let key = self.keys.physical(name);
        let bytes = encode(&value.into())?;
        self.dispatcher.invoke("setnx", |h| h.set_nx(&key, &bytes))
    }

    /// Sets a TTL on `name`. Returns false if the key does not exist.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn expire(&self, name: &str, secs: u64) -> CoreResult<bool> {
        let key = self.keys.physical(name);
        self.dispatcher.invoke("expire", |h| h.expire(&key, secs))
    }

    /// Deletes `name`. Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn del(&self, name: &str) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        self.dispatcher.invoke("del", |h| h.del(&key))
    }


    /// Deletes every key named in the set `set_name`, removing each name
    /// from the set as it goes.
    ///
    /// Members are logical names. Returns the set's size before deletion.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn del_by_set(&self, set_name: &str) -> CoreResult<u64> {
        let set = self.keys.physical(set_name);
        let count = self.dispatcher.invoke("scard", |h| h.scard(&set))?;
        let members = self.dispatcher.invoke("smembers", |h| h.smembers(&set))?;
        for member in members {
            let key = self.keys.physical(&String::from_utf8_lossy(&member));
            self.dispatcher.invoke("del", |h| h.del(&key))?;
            self.dispatcher.invoke("srem", |h| h.srem(&set, &member))?;
        }
        tracing::debug!(set = set_name, count, "deleted keys listed in set");
        Ok(count)
    }

    /// Physical keys under this client's prefix, or every key in the
    /// database when `all` is set.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn keys(&self, all: bool) -> CoreResult<Vec<String>> {
        let pattern = self.keys.pattern(all);
        let mut keys = self.dispatcher.invoke("keys", |h| h.keys(&pattern))?;
        keys.sort();
        Ok(keys)
    }

    /// Every key from [`Client::keys`] paired with its decoded value.
    ///
    /// Keys holding a list, set or hash appear with [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Store errors other than a type mismatch.
    pub fn all_data(&self, all: bool) -> CoreResult<Vec<(String, Value)>> {
        let keys = self.keys(all)?;
        let mut data = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match self.dispatcher.invoke("get", |h| h.get(&key)) {
                Ok(Some(raw)) => decode_or_null(&raw),
                Ok(None) => continue,
                Err(CoreError::Store(StoreError::WrongType(_))) => Value::Null,
                Err(e) => return Err(e),
            };
            data.push((key, value));
        }
        Ok(data)
    }

    /// Deletes every key under this client's prefix, or every key in the
    /// database when `all` is set. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn del_all(&self, all: bool) -> CoreResult<u64> {
        let keys = self.keys(all)?;
        let mut removed = 0;
        for key in keys {
            removed += self.dispatcher.invoke("del", |h| h.del(&key))?;
        }
        tracing::info!(removed, all, "deleted keys");
        Ok(removed)
    }


    /// Prepends `value` to the list `name`. Returns the new length.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn lpush(&self, name: &str, value: impl Into<Value>) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        let bytes = encode(&value.into())?;
        self.dispatcher.invoke("lpush", |h| h.lpush(&key, &bytes))
    }

    /// Appends `value` to the list `name`. Returns the new length.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn rpush(&self, name: &str, value: impl Into<Value>) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        let bytes = encode(&value.into())?;
        self.dispatcher.invoke("rpush", |h| h.rpush(&key, &bytes))
    }

    /// Removes and returns the head of the list `name`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn lpop(&self, name: &str) -> CoreResult<Option<Value>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("lpop", |h| h.lpop(&key))?;
        Ok(raw.and_then(|raw| decode_present(&raw)))
    }

    /// Removes and returns the tail of the list `name`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn rpop(&self, name: &str) -> CoreResult<Option<Value>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("rpop", |h| h.rpop(&key))?;
        Ok(raw.and_then(|raw| decode_present(&raw)))
    }

    /// Length of the list `name`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn llen(&self, name: &str) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        self.dispatcher.invoke("llen", |h| h.llen(&key))
    }

    /// Elements `start..=stop` of the list `name`; negative indices count
    /// from the end.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn lrange(&self, name: &str, start: i64, stop: i64) -> CoreResult<Vec<Value>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("lrange", |h| h.lrange(&key, start, stop))?;
        Ok(raw.iter().map(|raw| decode_or_null(raw)).collect())
    }


    /// Adds `member` to the set `name`. Returns the number added.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn sadd(&self, name: &str, member: impl Into<Value>) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        let bytes = encode(&member.into())?;
        self.dispatcher.invoke("sadd", |h| h.sadd(&key, &bytes))
    }

    /// Removes `member` from the set `name`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn srem(&self, name: &str, member: impl Into<Value>) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        let bytes = encode(&member.into())?;
        self.dispatcher.invoke("srem", |h| h.srem(&key, &bytes))
    }

    /// Members of the set `name`, in no particular order.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn smembers(&self, name: &str) -> CoreResult<Vec<Value>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("smembers", |h| h.smembers(&key))?;
        Ok(raw.iter().map(|raw| decode_or_null(raw)).collect())
    }

    /// Size of the set `name`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn scard(&self, name: &str) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        self.dispatcher.invoke("scard", |h| h.scard(&key))
    }

    /// Returns true if `member` is in the set `name`.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn sismember(&self, name: &str, member: impl Into<Value>) -> CoreResult<bool> {
        let key = self.keys.physical(name);
        let bytes = encode(&member.into())?;
        self.dispatcher.invoke("sismember", |h| h.sismember(&key, &bytes))
    }


    /// Sets `field` of the hash `name`. Returns true if the field is new.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn hset(&self, name: &str, field: &str, value: impl Into<Value>) -> CoreResult<bool> {
        let key = self.keys.physical(name);
        let bytes = encode(&value.into())?;
        self.dispatcher.invoke("hset", |h| h.hset(&key, field, &bytes))
    }

    /// Reads `field` of the hash `name`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn hget(&self, name: &str, field: &str) -> CoreResult<Option<Value>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("hget", |h| h.hget(&key, field))?;
        Ok(raw.and_then(|raw| decode_present(&raw)))
    }

    /// Removes `field` from the hash `name`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn hdel(&self, name: &str, field: &str) -> CoreResult<u64> {
        let key = self.keys.physical(name);
        self.dispatcher.invoke("hdel", |h| h.hdel(&key, field))
    }

    /// Every field of the hash `name`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn hgetall(&self, name: &str) -> CoreResult<Vec<(String, Value)>> {
        let key = self.keys.physical(name);
        let raw = self.dispatcher.invoke("hgetall", |h| h.hgetall(&key))?;
        Ok(raw
            .into_iter()
            .map(|(field, value)| (field, decode_or_null(&value)))
            .collect())
    }


    /// Publishes `message` on the prefixed `channel`. Returns the number of
    /// subscribers that received it.
    ///
    /// # Errors
    ///
    /// Codec or store errors.
    pub fn publish(&self, channel: &str, message: impl Into<Value>) -> CoreResult<u64> {
        let channel = self.keys.physical(channel);
        let bytes = encode(&message.into())?;
        self.dispatcher.invoke("publish", |h| h.publish(&channel, &bytes))
    }


    /// Tries to take the lock `name` for `ttl_secs` seconds.
    ///
    /// See [`LockManager`] for the record format and the stale-lock race.
    ///
    /// # Errors
    ///
    /// Store errors. Failing to get the lock is `Ok(false)`.
    pub fn lock(&self, name: &str, ttl_secs: u64) -> CoreResult<bool> {
        self.locks.acquire(&self.dispatcher, name, ttl_secs)
    }

    /// [`Client::lock`] with the configured default TTL.
    ///
    /// # Errors
    ///
    /// Same as [`Client::lock`].
    pub fn lock_default(&self, name: &str) -> CoreResult<bool> {
        self.lock(name, self.locks.config().default_ttl)
    }

    /// Releases the lock `name`. Always `Ok(true)` on success; ownership is
    /// not checked.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn unlock(&self, name: &str) -> CoreResult<bool> {
        self.locks.release(&self.dispatcher, name)
    }

    /// Reports whether the lock `name` is free, held or expired.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn lock_status(&self, name: &str) -> CoreResult<LockState> {
        self.locks.status(&self.dispatcher, name)
    }

    /// Reclaims every lock that expired more than the grace period ago.
    /// Returns the number reclaimed.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn clear_locks(&self) -> CoreResult<usize> {
        self.locks.sweep(&self.dispatcher)
    }
}

// A malformed tagged payload reads as absent.
fn decode_present(raw: &[u8]) -> Option<Value> {
    match try_decode(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "malformed tagged value, treating as absent");
            None
        }
    }
}

fn decode_or_null(raw: &[u8]) -> Value {
    decode_present(raw).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{LockConfig, ReconnectPolicy};
    use rediguard_store::{InMemoryServer, MemoryConnector};
    use std::thread;
    use std::time::Duration;

    fn open(server: &InMemoryServer, prefix: &str) -> Client {
        let config = ClientConfig::default().with_prefix(prefix);
        Client::new(config, MemoryConnector::new(server.clone())).unwrap()
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
    }

    #[test]
    fn string_round_trip() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        client.set("name", "zhangsan", None).unwrap();
        assert_eq!(
            client.get("name", "default").unwrap(),
            Value::Text("zhangsan".into())
        );
        assert_eq!(client.get("age", 20i64).unwrap(), Value::Integer(20));
    }

    #[test]
    fn counters() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        client.set("money", 100i64, None).unwrap();
        assert_eq!(client.inc("money", 5).unwrap(), 105);
        assert_eq!(client.dec("money", 5).unwrap(), 100);
        assert_eq!(client.inc("fresh", 1).unwrap(), 1);

        client.set("name", "zhangsan", None).unwrap();
        let err = client.inc("name", 1).unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::NotInteger)));
    }

    #[test]
    fn composite_values_survive() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");
        let profile = Value::map([
            ("name", Value::from("Alice")),
            ("tags", Value::from(vec!["a", "b"])),
        ]);

        client.set("profile", profile.clone(), None).unwrap();
        assert_eq!(client.get_opt("profile").unwrap(), Some(profile));
        assert_eq!(client.get_opt("missing").unwrap(), None);
    }

    #[test]
    fn malformed_payload_reads_as_absent() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");
        let broken = b"redis_serialize:\xa1".to_vec();

        client.set("bad", Value::Bytes(broken.clone()), Some(0)).unwrap();
        assert_eq!(client.get("bad", "fallback").unwrap(), Value::from("fallback"));
        assert_eq!(client.get_opt("bad").unwrap(), None);

        client.rpush("q", Value::Bytes(broken.clone())).unwrap();
        client.rpush("q", "ok").unwrap();
        assert_eq!(
            client.lrange("q", 0, -1).unwrap(),
            vec![Value::Null, Value::from("ok")]
        );
        assert_eq!(client.lpop("q").unwrap(), None);

        client.hset("h", "f", Value::Bytes(broken)).unwrap();
        assert_eq!(client.hget("h", "f").unwrap(), None);
        assert_eq!(client.hgetall("h").unwrap(), vec![("f".to_string(), Value::Null)]);
    }

    #[test]
    fn out_of_range_ttl_is_an_error() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        assert!(matches!(
            client.set("k", "v", Some(u64::MAX)),
            Err(CoreError::Store(StoreError::Server(_)))
        ));
        client.set("k", "v", Some(0)).unwrap();
        assert!(matches!(
            client.expire("k", u64::MAX),
            Err(CoreError::Store(StoreError::Server(_)))
        ));
        assert!(client.lock("big", u64::MAX).unwrap());
        assert!(!client.lock("big", 10).unwrap());
    }

    #[test]
    fn keys_are_prefixed() {
        let server = InMemoryServer::new();
        let a = open(&server, "a_");
        let b = open(&server, "b_");

        a.set("shared", "from-a", None).unwrap();
        b.set("shared", "from-b", None).unwrap();

        assert_eq!(a.get("shared", ()).unwrap(), Value::Text("from-a".into()));
        assert_eq!(a.keys(false).unwrap(), vec!["a_shared".to_string()]);
        assert_eq!(
            a.keys(true).unwrap(),
            vec!["a_shared".to_string(), "b_shared".to_string()]
        );
    }

    #[test]
    fn default_expiry_uses_setex() {
        let server = InMemoryServer::new();
        let config = ClientConfig::default().with_default_expire(1);
        let client = Client::new(config, MemoryConnector::new(server.clone())).unwrap();

        client.set("short", "x", None).unwrap();
        client.set("forever", "y", Some(0)).unwrap();
        thread::sleep(Duration::from_millis(1100));

        assert_eq!(client.get_opt("short").unwrap(), None);
        assert_eq!(client.get_opt("forever").unwrap(), Some(Value::Text("y".into())));
    }

    #[test]
    fn set_nx_and_expire() {
        let server = InMemoryServer::new();
        let client = open(&server, "");

        assert!(client.set_nx("k", 1i64).unwrap());
        assert!(!client.set_nx("k", 2i64).unwrap());
        assert!(client.expire("k", 100).unwrap());
        assert!(!client.expire("missing", 100).unwrap());
        assert_eq!(client.del("k").unwrap(), 1);
        assert_eq!(client.del("k").unwrap(), 0);
    }

    #[test]
    fn bulk_operations() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");
        let other = open(&server, "zz_");

        client.set("one", 1i64, None).unwrap();
        client.set("two", "2", None).unwrap();
        client.rpush("queue", "job").unwrap();
        other.set("foreign", "x", None).unwrap();

        let data = client.all_data(false).unwrap();
        assert_eq!(
            data,
            vec![
                ("app_one".to_string(), Value::Text("1".into())),
                ("app_queue".to_string(), Value::Null),
                ("app_two".to_string(), Value::Text("2".into())),
            ]
        );

        assert_eq!(client.del_all(false).unwrap(), 3);
        assert!(client.keys(false).unwrap().is_empty());
        assert_eq!(other.keys(false).unwrap(), vec!["zz_foreign".to_string()]);
    }

    #[test]
    fn del_by_set_removes_listed_keys() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        client.set("session:1", "a", None).unwrap();
        client.set("session:2", "b", None).unwrap();
        client.set("keep", "c", None).unwrap();
        client.sadd("sessions", "session:1").unwrap();
        client.sadd("sessions", "session:2").unwrap();

        assert_eq!(client.del_by_set("sessions").unwrap(), 2);
        assert_eq!(client.get_opt("session:1").unwrap(), None);
        assert_eq!(client.get_opt("session:2").unwrap(), None);
        assert!(client.get_opt("keep").unwrap().is_some());
        assert_eq!(client.scard("sessions").unwrap(), 0);

        assert_eq!(client.del_by_set("missing").unwrap(), 0);
    }

    #[test]
    fn list_operations() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        client.rpush("q", 1i64).unwrap();
        client.rpush("q", 2i64).unwrap();
        assert_eq!(client.lpush("q", 0i64).unwrap(), 3);
        assert_eq!(client.llen("q").unwrap(), 3);
        assert_eq!(
            client.lrange("q", 0, -1).unwrap(),
            vec![
                Value::Text("0".into()),
                Value::Text("1".into()),
                Value::Text("2".into())
            ]
        );
        assert_eq!(client.lpop("q").unwrap(), Some(Value::Text("0".into())));
        assert_eq!(client.rpop("q").unwrap(), Some(Value::Text("2".into())));
        assert_eq!(client.rpop("q").unwrap(), Some(Value::Text("1".into())));
        assert_eq!(client.rpop("q").unwrap(), None);
    }

    #[test]
    fn set_operations() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        assert_eq!(client.sadd("s", "a").unwrap(), 1);
        assert_eq!(client.sadd("s", "a").unwrap(), 0);
        client.sadd("s", "b").unwrap();
        assert_eq!(client.scard("s").unwrap(), 2);
        assert!(client.sismember("s", "a").unwrap());
        assert_eq!(client.srem("s", "a").unwrap(), 1);
        assert_eq!(client.smembers("s").unwrap(), vec![Value::Text("b".into())]);
    }

    #[test]
    fn hash_operations() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        assert!(client.hset("user", "name", "Alice").unwrap());
        assert!(!client.hset("user", "name", "Bob").unwrap());
        client.hset("user", "age", 30i64).unwrap();

        assert_eq!(
            client.hget("user", "name").unwrap(),
            Some(Value::Text("Bob".into()))
        );
        let mut all = client.hgetall("user").unwrap();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            all,
            vec![
                ("age".to_string(), Value::Text("30".into())),
                ("name".to_string(), Value::Text("Bob".into())),
            ]
        );
        assert_eq!(client.hdel("user", "age").unwrap(), 1);
        assert_eq!(client.hget("user", "age").unwrap(), None);
    }

    #[test]
    fn publish_uses_prefixed_channel() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        assert_eq!(client.publish("events", "hello").unwrap(), 0);
        assert_eq!(
            server.published(),
            vec![("app_events".to_string(), b"hello".to_vec())]
        );
    }

    #[test]
    fn lock_scenario() {
        let server = InMemoryServer::new();
        let client = open(&server, "app_");

        assert!(client.lock("foo", 10).unwrap());
        assert!(!client.lock("foo", 10).unwrap());
        assert!(client.unlock("foo").unwrap());
        assert!(client.lock("foo", 10).unwrap());
    }

    #[test]
    fn default_lock_ttl_and_sweep() {
        let server = InMemoryServer::new();
        let clock = ManualClock::new(1_700_000_000);
        let config = ClientConfig::default()
            .with_prefix("app_")
            .with_lock(LockConfig::default().with_key_expiry(false).with_default_ttl(5));
        let client = Client::with_clock(
            config,
            MemoryConnector::new(server.clone()),
            Arc::new(clock.clone()),
        )
        .unwrap();

        assert!(client.lock_default("job").unwrap());
        assert_eq!(
            client.lock_status("job").unwrap(),
            LockState::Held {
                expires_at: Some(1_700_000_005)
            }
        );

        clock.advance(120);
        assert_eq!(client.clear_locks().unwrap(), 1);
        assert_eq!(client.lock_status("job").unwrap(), LockState::Free);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let server = InMemoryServer::new();
        let config = ClientConfig::new("", 6379);
        let err = Client::new(config, MemoryConnector::new(server)).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
    }

    #[test]
    fn initial_connect_failure_is_reported() {
        let server = InMemoryServer::new();
        server.set_down(true);
        let err = Client::new(ClientConfig::default(), MemoryConnector::new(server)).unwrap_err();
        assert!(matches!(err, CoreError::Connection { .. }));
    }

    #[test]
    fn operations_survive_dropped_connection() {
        let server = InMemoryServer::new();
        let config = ClientConfig::default()
            .with_reconnect(ReconnectPolicy::new(2, Duration::from_millis(5)));
        let client = Client::new(config, MemoryConnector::new(server.clone())).unwrap();

        client.set("k", "v", None).unwrap();
        server.drop_next(1);
        assert_eq!(client.get("k", ()).unwrap(), Value::Text("v".into()));
        assert_eq!(client.stats().reconnects, 1);
    }

    #[test]
    fn shared_between_threads() {
        let server = InMemoryServer::new();
        let client = Arc::new(open(&server, "app_"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = Arc::clone(&client);
                thread::spawn(move || {
                    for _ in 0..25 {
                        client.inc("hits", 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(client.get("hits", 0i64).unwrap().as_i64(), Some(100));
    }
}
