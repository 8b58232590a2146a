//! In-memory store for testing.

use crate::backend::{ConnectOptions, Connector, StoreClient};
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_DATABASES: u32 = 16;

#[derive(Debug, Clone)]
enum Entry {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    Hash(BTreeMap<String, Vec<u8>>),
}

impl Entry {
    fn type_name(&self) -> &'static str {
        match self {
            Entry::Str(_) => "string",
            Entry::List(_) => "list",
            Entry::Set(_) => "set",
            Entry::Hash(_) => "hash",
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Entry,
    expires_at: Option<Instant>,
}

type Keyspace = HashMap<String, Slot>;

#[derive(Debug)]
struct ServerState {
    databases: Vec<Keyspace>,
    password: Option<String>,
    down: bool,
    // Bumped whenever the server goes down; handles from an older
    // generation are dead.
    generation: u64,
    drop_next: u32,
    connects: u64,
    commands: u64,
    published: Vec<(String, Vec<u8>)>,
}

/// An in-process key-value server shared by all of its handles.
///
/// The server models the parts of Redis the wrapper relies on: strings
/// with TTL, lists, sets, hashes, numbered databases, an optional
/// password and publish. It also supports fault injection:
///
/// - [`set_down`](Self::set_down) makes the server unreachable and
///   invalidates every open handle
/// - [`drop_next`](Self::drop_next) makes the next commands fail with a
///   disconnect, killing the handle that issued them
///
/// Cloning yields another reference to the same server.
///
/// # Example
///
/// ```rust
/// use rediguard_store::{ConnectOptions, Connector, InMemoryServer, MemoryConnector, StoreClient};
///
/// let server = InMemoryServer::new();
/// let connector = MemoryConnector::new(server.clone());
/// let mut handle = connector.connect(&ConnectOptions::new("memory", 0)).unwrap();
/// handle.set("greeting", b"hello").unwrap();
/// assert_eq!(handle.get("greeting").unwrap(), Some(b"hello".to_vec()));
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl Default for InMemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryServer {
    /// Creates an empty server with 16 databases and no password.
    #[must_use]
    pub fn new() -> Self {
        Self::with_databases(DEFAULT_DATABASES)
    }

    /// Creates an empty server with `count` databases.
    #[must_use]
    pub fn with_databases(count: u32) -> Self {
        let databases = (0..count.max(1)).map(|_| Keyspace::new()).collect();
        Self {
            state: Arc::new(Mutex::new(ServerState {
                databases,
                password: None,
                down: false,
                generation: 0,
                drop_next: 0,
                connects: 0,
                commands: 0,
                published: Vec::new(),
            })),
        }
    }

    /// Requires clients to authenticate with `password`.
    #[must_use]
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.state.lock().password = Some(password.into());
        self
    }

    /// Takes the server down or brings it back up.
    ///
    /// Going down invalidates all open handles; data is kept.
    pub fn set_down(&self, down: bool) {
        let mut state = self.state.lock();
        if down && !state.down {
            state.generation += 1;
        }
        state.down = down;
    }

    /// Returns true if the server is unreachable.
    pub fn is_down(&self) -> bool {
        self.state.lock().down
    }

    /// Makes the next `count` commands fail with a disconnect.
    pub fn drop_next(&self, count: u32) {
        self.state.lock().drop_next = count;
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> u64 {
        self.state.lock().connects
    }

    /// Number of commands that reached the keyspace.
    pub fn command_count(&self) -> u64 {
        self.state.lock().commands
    }

    /// Messages published so far, in order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().published.clone()
    }

    /// Number of live keys in a database.
    pub fn key_count(&self, db: u32) -> usize {
        let now = Instant::now();
        let state = self.state.lock();
        state
            .databases
            .get(db as usize)
            .map(|keyspace| keyspace.values().filter(|slot| is_live(slot, now)).count())
            .unwrap_or(0)
    }

    /// Removes all keys from all databases.
    pub fn flush_all(&self) {
        let mut state = self.state.lock();
        for keyspace in &mut state.databases {
            keyspace.clear();
        }
    }

    fn open(&self) -> StoreResult<MemoryClient> {
        let mut state = self.state.lock();
        if state.down {
            return Err(StoreError::disconnected("connection refused"));
        }
        state.connects += 1;
        Ok(MemoryClient {
            server: self.clone(),
            db: 0,
            authenticated: state.password.is_none(),
            generation: state.generation,
            broken: false,
        })
    }
}

fn is_live(slot: &Slot, now: Instant) -> bool {
    slot.expires_at.map_or(true, |at| at > now)
}

/// A handle to an [`InMemoryServer`].
#[derive(Debug)]
pub struct MemoryClient {
    server: InMemoryServer,
    db: u32,
    authenticated: bool,
    generation: u64,
    broken: bool,
}

impl MemoryClient {
    fn check_link(&mut self, state: &mut ServerState) -> StoreResult<()> {
        if self.broken || state.down || state.generation != self.generation {
            self.broken = true;
            return Err(StoreError::disconnected("connection reset by peer"));
        }
        if state.drop_next > 0 {
            state.drop_next -= 1;
            self.broken = true;
            return Err(StoreError::disconnected("broken pipe"));
        }
        Ok(())
    }

    fn run<T>(&mut self, f: impl FnOnce(&mut Keyspace, Instant) -> StoreResult<T>) -> StoreResult<T> {
        let server = self.server.clone();
        let mut state = server.state.lock();
        self.check_link(&mut state)?;
        if !self.authenticated {
            return Err(StoreError::Auth("NOAUTH authentication required".into()));
        }
        state.commands += 1;
        let now = Instant::now();
        let keyspace = &mut state.databases[self.db as usize];
        keyspace.retain(|_, slot| is_live(slot, now));
        f(keyspace, now)
    }
}

fn wrong_type(key: &str, found: &Entry) -> StoreError {
    StoreError::WrongType(format!("key {key} holds a {}", found.type_name()))
}

fn string_of<'a>(keyspace: &'a Keyspace, key: &str) -> StoreResult<Option<&'a Vec<u8>>> {
    match keyspace.get(key).map(|slot| &slot.entry) {
        None => Ok(None),
        Some(Entry::Str(value)) => Ok(Some(value)),
        Some(other) => Err(wrong_type(key, other)),
    }
}

fn list_mut<'a>(keyspace: &'a mut Keyspace, key: &str) -> StoreResult<&'a mut VecDeque<Vec<u8>>> {
    let slot = keyspace.entry(key.to_string()).or_insert_with(|| Slot {
        entry: Entry::List(VecDeque::new()),
        expires_at: None,
    });
    match &mut slot.entry {
        Entry::List(list) => Ok(list),
        other => Err(wrong_type(key, other)),
    }
}

fn set_mut<'a>(keyspace: &'a mut Keyspace, key: &str) -> StoreResult<&'a mut BTreeSet<Vec<u8>>> {
    let slot = keyspace.entry(key.to_string()).or_insert_with(|| Slot {
        entry: Entry::Set(BTreeSet::new()),
        expires_at: None,
    });
    match &mut slot.entry {
        Entry::Set(set) => Ok(set),
        other => Err(wrong_type(key, other)),
    }
}

fn hash_mut<'a>(
    keyspace: &'a mut Keyspace,
    key: &str,
) -> StoreResult<&'a mut BTreeMap<String, Vec<u8>>> {
    let slot = keyspace.entry(key.to_string()).or_insert_with(|| Slot {
        entry: Entry::Hash(BTreeMap::new()),
        expires_at: None,
    });
    match &mut slot.entry {
        Entry::Hash(hash) => Ok(hash),
        other => Err(wrong_type(key, other)),
    }
}

// Empty containers do not exist in Redis.
fn drop_if_empty(keyspace: &mut Keyspace, key: &str) {
    let empty = match keyspace.get(key).map(|slot| &slot.entry) {
        Some(Entry::List(list)) => list.is_empty(),
        Some(Entry::Set(set)) => set.is_empty(),
        Some(Entry::Hash(hash)) => hash.is_empty(),
        _ => false,
    };
    if empty {
        keyspace.remove(key);
    }
}

fn set_members<'a>(
    keyspace: &'a Keyspace,
    key: &str,
) -> StoreResult<Option<&'a BTreeSet<Vec<u8>>>> {
    match keyspace.get(key).map(|slot| &slot.entry) {
        None => Ok(None),
        Some(Entry::Set(set)) => Ok(Some(set)),
        Some(other) => Err(wrong_type(key, other)),
    }
}

fn list_items<'a>(
    keyspace: &'a Keyspace,
    key: &str,
) -> StoreResult<Option<&'a VecDeque<Vec<u8>>>> {
    match keyspace.get(key).map(|slot| &slot.entry) {
        None => Ok(None),
        Some(Entry::List(list)) => Ok(Some(list)),
        Some(other) => Err(wrong_type(key, other)),
    }
}

fn hash_fields<'a>(
    keyspace: &'a Keyspace,
    key: &str,
) -> StoreResult<Option<&'a BTreeMap<String, Vec<u8>>>> {
    match keyspace.get(key).map(|slot| &slot.entry) {
        None => Ok(None),
        Some(Entry::Hash(hash)) => Ok(Some(hash)),
        Some(other) => Err(wrong_type(key, other)),
    }
}

// Out-of-range expiries are rejected rather than saturated.
fn expiry_after(now: Instant, ttl_secs: u64) -> StoreResult<Instant> {
    now.checked_add(Duration::from_secs(ttl_secs))
        .ok_or_else(|| StoreError::server("invalid expire time"))
}

/// Matches a Redis-style glob supporting `*` and `?`.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

fn parse_integer(raw: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(StoreError::NotInteger)
}

fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

impl StoreClient for MemoryClient {
    fn auth(&mut self, password: &str) -> StoreResult<()> {
        let server = self.server.clone();
        let mut state = server.state.lock();
        self.check_link(&mut state)?;
        match &state.password {
            Some(expected) if expected != password => {
                Err(StoreError::Auth("WRONGPASS invalid password".into()))
            }
            _ => {
                self.authenticated = true;
                Ok(())
            }
        }
    }

    fn select(&mut self, db: u32) -> StoreResult<()> {
        let server = self.server.clone();
        let mut state = server.state.lock();
        self.check_link(&mut state)?;
        if db as usize >= state.databases.len() {
            return Err(StoreError::InvalidDatabase(db));
        }
        self.db = db;
        Ok(())
    }

    fn get(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.run(|keyspace, _| Ok(string_of(keyspace, key)?.cloned()))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.run(|keyspace, _| {
            keyspace.insert(
                key.to_string(),
                Slot {
                    entry: Entry::Str(value.to_vec()),
                    expires_at: None,
                },
            );
            Ok(())
        })
    }

    fn set_ex(&mut self, key: &str, value: &[u8], ttl_secs: u64) -> StoreResult<()> {
        if ttl_secs == 0 {
            return Err(StoreError::server("invalid expire time in 'setex' command"));
        }
        self.run(|keyspace, now| {
            keyspace.insert(
                key.to_string(),
                Slot {
                    entry: Entry::Str(value.to_vec()),
                    expires_at: Some(expiry_after(now, ttl_secs)?),
                },
            );
            Ok(())
        })
    }

    fn set_nx(&mut self, key: &str, value: &[u8]) -> StoreResult<bool> {
        self.run(|keyspace, _| {
            if keyspace.contains_key(key) {
                return Ok(false);
            }
            keyspace.insert(
                key.to_string(),
                Slot {
                    entry: Entry::Str(value.to_vec()),
                    expires_at: None,
                },
            );
            Ok(true)
        })
    }

    fn del(&mut self, key: &str) -> StoreResult<u64> {
        self.run(|keyspace, _| Ok(u64::from(keyspace.remove(key).is_some())))
    }

    fn expire(&mut self, key: &str, ttl_secs: u64) -> StoreResult<bool> {
        self.run(|keyspace, now| {
            if ttl_secs == 0 {
                return Ok(keyspace.remove(key).is_some());
            }
            match keyspace.get_mut(key) {
                Some(slot) => {
                    slot.expires_at = Some(expiry_after(now, ttl_secs)?);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn incr_by(&mut self, key: &str, delta: i64) -> StoreResult<i64> {
        self.run(|keyspace, _| {
            let current = match string_of(keyspace, key)? {
                Some(raw) => parse_integer(raw)?,
                None => 0,
            };
            let next = current.checked_add(delta).ok_or(StoreError::NotInteger)?;
            let bytes = next.to_string().into_bytes();
            match keyspace.get_mut(key) {
                Some(slot) => slot.entry = Entry::Str(bytes),
                None => {
                    keyspace.insert(
                        key.to_string(),
                        Slot {
                            entry: Entry::Str(bytes),
                            expires_at: None,
                        },
                    );
                }
            }
            Ok(next)
        })
    }

    fn keys(&mut self, pattern: &str) -> StoreResult<Vec<String>> {
        self.run(|keyspace, _| {
            let mut keys: Vec<String> = keyspace
                .keys()
                .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn sadd(&mut self, key: &str, member: &[u8]) -> StoreResult<u64> {
        self.run(|keyspace, _| Ok(u64::from(set_mut(keyspace, key)?.insert(member.to_vec()))))
    }

    fn srem(&mut self, key: &str, member: &[u8]) -> StoreResult<u64> {
        self.run(|keyspace, _| {
            if set_members(keyspace, key)?.is_none() {
                return Ok(0);
            }
            let removed = set_mut(keyspace, key)?.remove(member);
            drop_if_empty(keyspace, key);
            Ok(u64::from(removed))
        })
    }

    fn smembers(&mut self, key: &str) -> StoreResult<Vec<Vec<u8>>> {
        self.run(|keyspace, _| {
            Ok(set_members(keyspace, key)?
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn scard(&mut self, key: &str) -> StoreResult<u64> {
        self.run(|keyspace, _| Ok(set_members(keyspace, key)?.map_or(0, |set| set.len() as u64)))
    }

    fn sismember(&mut self, key: &str, member: &[u8]) -> StoreResult<bool> {
        self.run(|keyspace, _| {
            Ok(set_members(keyspace, key)?.is_some_and(|set| set.contains(member)))
        })
    }

    fn lpush(&mut self, key: &str, value: &[u8]) -> StoreResult<u64> {
        self.run(|keyspace, _| {
            let list = list_mut(keyspace, key)?;
            list.push_front(value.to_vec());
            Ok(list.len() as u64)
        })
    }

    fn rpush(&mut self, key: &str, value: &[u8]) -> StoreResult<u64> {
        self.run(|keyspace, _| {
            let list = list_mut(keyspace, key)?;
            list.push_back(value.to_vec());
            Ok(list.len() as u64)
        })
    }

    fn lpop(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.run(|keyspace, _| {
            if list_items(keyspace, key)?.is_none() {
                return Ok(None);
            }
            let value = list_mut(keyspace, key)?.pop_front();
            drop_if_empty(keyspace, key);
            Ok(value)
        })
    }

    fn rpop(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.run(|keyspace, _| {
            if list_items(keyspace, key)?.is_none() {
                return Ok(None);
            }
            let value = list_mut(keyspace, key)?.pop_back();
            drop_if_empty(keyspace, key);
            Ok(value)
        })
    }

    fn llen(&mut self, key: &str) -> StoreResult<u64> {
        self.run(|keyspace, _| Ok(list_items(keyspace, key)?.map_or(0, |list| list.len() as u64)))
    }

    fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        self.run(|keyspace, _| {
            let Some(list) = list_items(keyspace, key)? else {
                return Ok(Vec::new());
            };
            Ok(match resolve_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            })
        })
    }

    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<bool> {
        self.run(|keyspace, _| {
            Ok(hash_mut(keyspace, key)?
                .insert(field.to_string(), value.to_vec())
                .is_none())
        })
    }

    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.run(|keyspace, _| {
            Ok(hash_fields(keyspace, key)?.and_then(|hash| hash.get(field).cloned()))
        })
    }

    fn hdel(&mut self, key: &str, field: &str) -> StoreResult<u64> {
        self.run(|keyspace, _| {
            if hash_fields(keyspace, key)?.is_none() {
                return Ok(0);
            }
            let removed = hash_mut(keyspace, key)?.remove(field).is_some();
            drop_if_empty(keyspace, key);
            Ok(u64::from(removed))
        })
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        self.run(|keyspace, _| {
            Ok(hash_fields(keyspace, key)?
                .map(|hash| hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
                .unwrap_or_default())
        })
    }

    fn publish(&mut self, channel: &str, message: &[u8]) -> StoreResult<u64> {
        let server = self.server.clone();
        let mut state = server.state.lock();
        self.check_link(&mut state)?;
        if !self.authenticated {
            return Err(StoreError::Auth("NOAUTH authentication required".into()));
        }
        state.commands += 1;
        state.published.push((channel.to_string(), message.to_vec()));
        // No subscribers are modelled.
        Ok(0)
    }
}

/// Connects to an [`InMemoryServer`].
///
/// Host, port and timeout are ignored. Persistent channels are not
/// modelled: every connect yields a fresh handle.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    server: InMemoryServer,
}

impl MemoryConnector {
    /// Creates a connector for `server`.
    #[must_use]
    pub fn new(server: InMemoryServer) -> Self {
        Self { server }
    }

    /// Returns the server this connector targets.
    pub fn server(&self) -> &InMemoryServer {
        &self.server
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _options: &ConnectOptions) -> StoreResult<Box<dyn StoreClient>> {
        Ok(Box::new(self.server.open()?))
    }
}
