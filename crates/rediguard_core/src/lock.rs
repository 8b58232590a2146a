//! Advisory locks on top of create-if-absent.
//!
//! A lock named `n` is the key `<prefix>lock:n` holding the absolute expiry
//! time (seconds since the epoch, decimal text). `SETNX` decides who gets
//! it. Every name ever acquired is also recorded in `<prefix>lock:all_locks`
//! so a sweep can find locks whose holder died without releasing. That set
//! sits on the record key of the name `all_locks`, which is therefore
//! reserved: it can never be acquired, released or held.
//!
//! ## Stale records
//!
//! A record whose expiry is in the past is stale. When an acquire finds one
//! it deletes it and tries `SETNX` once more. The delete and the create are
//! two separate store calls, so two clients reclaiming the same stale lock
//! at once can both observe success. Locks are advisory; callers needing
//! strict exclusion must not rely on stale reclamation.
//!
//! ## Release
//!
//! [`LockManager::release`] deletes the record unconditionally. There is no
//! owner token, so any client can release any lock.

use crate::clock::Clock;
use crate::config::LockConfig;
use crate::dispatch::Dispatcher;
use crate::error::CoreResult;
use crate::keys::KeyCodec;
use std::sync::Arc;

/// Observed state of a lock name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No record exists.
    Free,
    /// A record exists and has not expired.
    ///
    /// `expires_at` is `None` when the record does not hold a timestamp.
    Held {
        /// Expiry time in seconds since the epoch.
        expires_at: Option<u64>,
    },
    /// A record exists but its expiry has passed.
    Expired {
        /// When it expired, in seconds since the epoch.
        expired_at: u64,
    },
}

/// Acquires, releases and sweeps lock records.
#[derive(Debug, Clone)]
pub struct LockManager {
    keys: KeyCodec,
    config: LockConfig,
    clock: Arc<dyn Clock>,
}

impl LockManager {
    /// Creates a lock manager.
    pub fn new(keys: KeyCodec, config: LockConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys,
            config,
            clock,
        }
    }

    /// Lock settings in use.
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Tries to take the lock `name` for `ttl_secs`.
    ///
    /// Returns `Ok(false)` when another holder has it and it has not
    /// expired, or when `name` is reserved. A stale record is reclaimed with
    /// one retry.
    ///
    /// Once the record is created the lock is held; a failing opportunistic
    /// sweep afterwards is logged and does not change the result.
    ///
    /// # Errors
    ///
    /// Store errors propagate unchanged.
    pub fn acquire(&self, dispatcher: &Dispatcher, name: &str, ttl_secs: u64) -> CoreResult<bool> {
        if KeyCodec::is_reserved_lock_name(name) {
            tracing::debug!(lock = name, "reserved lock name");
            return Ok(false);
        }
        let key = self.keys.lock_key(name);

        if self.try_create(dispatcher, name, &key, ttl_secs)? {
            tracing::debug!(lock = name, ttl_secs, "lock acquired");
            self.sweep_after_acquire(dispatcher);
            return Ok(true);
        }

        let now = self.clock.now_secs();
        let current = dispatcher.invoke("get", |h| h.get(&key))?;
        match current.as_deref().and_then(parse_timestamp) {
            Some(expiry) if expiry < now => {
                tracing::debug!(lock = name, expiry, now, "reclaiming stale lock");
                dispatcher.invoke("del", |h| h.del(&key))?;
                let acquired = self.try_create(dispatcher, name, &key, ttl_secs)?;
                if acquired {
                    self.sweep_after_acquire(dispatcher);
                }
                Ok(acquired)
            }
            _ => {
                tracing::debug!(lock = name, "lock busy");
                Ok(false)
            }
        }
    }

    fn try_create(
        &self,
        dispatcher: &Dispatcher,
        name: &str,
        key: &str,
        ttl_secs: u64,
    ) -> CoreResult<bool> {
        let expiry = self.clock.now_secs().saturating_add(ttl_secs).to_string();
        let created = dispatcher.invoke("setnx", |h| h.set_nx(key, expiry.as_bytes()))?;
        if !created {
            return Ok(false);
        }
        // The lock is held from here on; follow-up failures only cost
        // store-side expiry or sweep tracking.
        if self.config.set_key_expiry && ttl_secs > 0 {
            if let Err(e) = dispatcher.invoke("expire", |h| h.expire(key, ttl_secs)) {
                tracing::warn!(lock = name, error = %e, "failed to set lock expiry");
            }
        }
        let set = self.keys.lock_set();
        if let Err(e) = dispatcher.invoke("sadd", |h| h.sadd(&set, name.as_bytes())) {
            tracing::warn!(lock = name, error = %e, "failed to track lock");
        }
        Ok(true)
    }

    fn sweep_after_acquire(&self, dispatcher: &Dispatcher) {
        if let Err(e) = self.maybe_sweep(dispatcher) {
            tracing::warn!(error = %e, "opportunistic lock sweep failed");
        }
    }

    /// Releases the lock `name`. Returns `true`, or `false` without
    /// touching the store when `name` is reserved.
    ///
    /// # Errors
    ///
    /// Store errors propagate unchanged.
    pub fn release(&self, dispatcher: &Dispatcher, name: &str) -> CoreResult<bool> {
        if KeyCodec::is_reserved_lock_name(name) {
            return Ok(false);
        }
        let key = self.keys.lock_key(name);
        dispatcher.invoke("del", |h| h.del(&key))?;
        tracing::debug!(lock = name, "lock released");
        Ok(true)
    }

    /// Reports the state of the lock `name`. A reserved name is always
    /// [`LockState::Free`].
    ///
    /// # Errors
    ///
    /// Store errors propagate unchanged.
    pub fn status(&self, dispatcher: &Dispatcher, name: &str) -> CoreResult<LockState> {
        if KeyCodec::is_reserved_lock_name(name) {
            return Ok(LockState::Free);
        }
        let key = self.keys.lock_key(name);
        let now = self.clock.now_secs();
        let state = match dispatcher.invoke("get", |h| h.get(&key))? {
            None => LockState::Free,
            Some(raw) => match parse_timestamp(&raw) {
                Some(expiry) if expiry < now => LockState::Expired { expired_at: expiry },
                expires_at => LockState::Held { expires_at },
            },
        };
        Ok(state)
    }

    /// Reclaims locks that expired more than the grace period ago.
    ///
    /// Tracked names whose record no longer exists are pruned from the
    /// tracking set without being counted. Returns the number of locks
    /// reclaimed.
    ///
    /// # Errors
    ///
    /// Store errors propagate unchanged.
    pub fn sweep(&self, dispatcher: &Dispatcher) -> CoreResult<usize> {
        let set = self.keys.lock_set();
        let cutoff = self
            .clock
            .now_secs()
            .saturating_sub(self.config.sweep_grace.as_secs());
        let members = dispatcher.invoke("smembers", |h| h.smembers(&set))?;

        let mut reclaimed = 0;
        for member in members {
            let Ok(name) = String::from_utf8(member) else {
                continue;
            };
            let key = self.keys.lock_key(&name);
            match dispatcher.invoke("get", |h| h.get(&key))? {
                None => {
                    dispatcher.invoke("srem", |h| h.srem(&set, name.as_bytes()))?;
                }
                Some(raw) => {
                    if parse_timestamp(&raw).is_some_and(|expiry| expiry < cutoff) {
                        dispatcher.invoke("del", |h| h.del(&key))?;
                        dispatcher.invoke("srem", |h| h.srem(&set, name.as_bytes()))?;
                        reclaimed += 1;
                    }
                }
            }
        }

        if reclaimed > 0 {
            tracing::info!(reclaimed, "swept stale locks");
        }
        Ok(reclaimed)
    }

    /// Runs [`sweep`](Self::sweep) unless one ran within the cooldown.
    ///
    /// The cooldown is a sentinel key created with `SETNX` holding the time
    /// the next sweep is due. Returns the number reclaimed, or `None` when
    /// skipped.
    ///
    /// # Errors
    ///
    /// Store errors propagate unchanged.
    pub fn maybe_sweep(&self, dispatcher: &Dispatcher) -> CoreResult<Option<usize>> {
        let guard = self.keys.sweep_guard();
        let now = self.clock.now_secs();
        let cooldown = self.config.sweep_cooldown.as_secs();
        let due = now.saturating_add(cooldown).to_string();

        let mut claimed = dispatcher.invoke("setnx", |h| h.set_nx(&guard, due.as_bytes()))?;
        if !claimed {
            // A guard whose due time has passed (for instance one that lost
            // its store-side expiry) is replaced.
            let current = dispatcher.invoke("get", |h| h.get(&guard))?;
            if current.as_deref().and_then(parse_timestamp).is_some_and(|at| at <= now) {
                dispatcher.invoke("del", |h| h.del(&guard))?;
                claimed = dispatcher.invoke("setnx", |h| h.set_nx(&guard, due.as_bytes()))?;
            }
        }
        if !claimed {
            return Ok(None);
        }
        if cooldown > 0 {
            dispatcher.invoke("expire", |h| h.expire(&guard, cooldown))?;
        }
        self.sweep(dispatcher).map(Some)
    }
}

fn parse_timestamp(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ClientConfig, ReconnectPolicy};
    use crate::connection::ConnectionManager;
    use rediguard_store::{InMemoryServer, MemoryConnector};
    use std::time::Duration;

    const T0: u64 = 1_700_000_000;

    struct Fixture {
        server: InMemoryServer,
        clock: ManualClock,
        dispatcher: Dispatcher,
        locks: LockManager,
    }

    fn fixture(config: LockConfig) -> Fixture {
        let server = InMemoryServer::new();
        let clock = ManualClock::new(T0);
        let manager = ConnectionManager::new(
            &ClientConfig::default(),
            Arc::new(MemoryConnector::new(server.clone())),
        );
        let dispatcher = Dispatcher::new(manager, ReconnectPolicy::default());
        dispatcher.connect().unwrap();
        let locks = LockManager::new(KeyCodec::new("app_"), config, Arc::new(clock.clone()));
        Fixture {
            server,
            clock,
            dispatcher,
            locks,
        }
    }

    fn raw_get(f: &Fixture, key: &str) -> Option<Vec<u8>> {
        f.dispatcher.invoke("get", |h| h.get(key)).unwrap()
    }

    #[test]
    fn acquire_release_cycle() {
        let f = fixture(LockConfig::default());

        assert!(f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
        assert!(!f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
        assert!(f.locks.release(&f.dispatcher, "foo").unwrap());
        assert!(f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
    }

    #[test]
    fn record_holds_expiry_and_is_tracked() {
        let f = fixture(LockConfig::default());
        f.locks.acquire(&f.dispatcher, "foo", 10).unwrap();

        let record = raw_get(&f, "app_lock:foo").unwrap();
        assert_eq!(record, (T0 + 10).to_string().into_bytes());

        let members = f
            .dispatcher
            .invoke("smembers", |h| h.smembers("app_lock:all_locks"))
            .unwrap();
        assert_eq!(members, vec![b"foo".to_vec()]);
    }

    #[test]
    fn release_of_free_lock_is_true() {
        let f = fixture(LockConfig::default());
        assert!(f.locks.release(&f.dispatcher, "never-taken").unwrap());
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let f = fixture(LockConfig::default().with_key_expiry(false));
        assert!(f.locks.acquire(&f.dispatcher, "job", 5).unwrap());

        f.clock.advance(5);
        assert!(!f.locks.acquire(&f.dispatcher, "job", 5).unwrap());

        f.clock.advance(1);
        assert!(f.locks.acquire(&f.dispatcher, "job", 5).unwrap());
        assert_eq!(
            raw_get(&f, "app_lock:job").unwrap(),
            (T0 + 11).to_string().into_bytes()
        );
    }

    #[test]
    fn zero_ttl_is_held_within_the_same_second() {
        let f = fixture(LockConfig::default());
        assert!(f.locks.acquire(&f.dispatcher, "z", 0).unwrap());
        assert!(!f.locks.acquire(&f.dispatcher, "z", 0).unwrap());
        f.clock.advance(1);
        assert!(f.locks.acquire(&f.dispatcher, "z", 0).unwrap());
    }

    #[test]
    fn non_numeric_record_is_never_reclaimed() {
        let f = fixture(LockConfig::default());
        f.dispatcher
            .invoke("set", |h| h.set("app_lock:odd", b"held-by-someone"))
            .unwrap();
        f.clock.advance(10_000);

        assert!(!f.locks.acquire(&f.dispatcher, "odd", 5).unwrap());
        assert_eq!(
            f.locks.status(&f.dispatcher, "odd").unwrap(),
            LockState::Held { expires_at: None }
        );
    }

    #[test]
    fn status_tracks_lifecycle() {
        let f = fixture(LockConfig::default().with_key_expiry(false));
        assert_eq!(f.locks.status(&f.dispatcher, "s").unwrap(), LockState::Free);

        f.locks.acquire(&f.dispatcher, "s", 3).unwrap();
        assert_eq!(
            f.locks.status(&f.dispatcher, "s").unwrap(),
            LockState::Held {
                expires_at: Some(T0 + 3)
            }
        );

        f.clock.advance(4);
        assert_eq!(
            f.locks.status(&f.dispatcher, "s").unwrap(),
            LockState::Expired { expired_at: T0 + 3 }
        );
    }

    #[test]
    fn sweep_respects_grace_period() {
        let f = fixture(LockConfig::default().with_key_expiry(false));
        f.locks.acquire(&f.dispatcher, "old", 1).unwrap();
        f.locks.acquire(&f.dispatcher, "fresh", 1000).unwrap();

        f.clock.advance(30);
        assert_eq!(f.locks.sweep(&f.dispatcher).unwrap(), 0);

        f.clock.advance(40);
        assert_eq!(f.locks.sweep(&f.dispatcher).unwrap(), 1);
        assert!(raw_get(&f, "app_lock:old").is_none());
        assert!(raw_get(&f, "app_lock:fresh").is_some());

        let members = f
            .dispatcher
            .invoke("smembers", |h| h.smembers("app_lock:all_locks"))
            .unwrap();
        assert_eq!(members, vec![b"fresh".to_vec()]);
    }

    #[test]
    fn sweep_prunes_released_names() {
        let f = fixture(LockConfig::default());
        f.locks.acquire(&f.dispatcher, "gone", 10).unwrap();
        f.locks.release(&f.dispatcher, "gone").unwrap();

        assert_eq!(f.locks.sweep(&f.dispatcher).unwrap(), 0);
        let count = f
            .dispatcher
            .invoke("scard", |h| h.scard("app_lock:all_locks"))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn maybe_sweep_honours_cooldown() {
        let config = LockConfig::default()
            .with_key_expiry(false)
            .with_sweep_cooldown(Duration::from_secs(300))
            .with_sweep_grace(Duration::from_secs(60));
        let f = fixture(config);

        // The first acquire claims the cooldown window.
        f.locks.acquire(&f.dispatcher, "a", 1).unwrap();
        assert!(raw_get(&f, "app_lock_sweep_guard").is_some());

        f.clock.advance(100);
        assert_eq!(f.locks.maybe_sweep(&f.dispatcher).unwrap(), None);
        assert!(raw_get(&f, "app_lock:a").is_some());

        f.clock.advance(200);
        assert_eq!(f.locks.maybe_sweep(&f.dispatcher).unwrap(), Some(1));
        assert!(raw_get(&f, "app_lock:a").is_none());

        assert_eq!(f.locks.maybe_sweep(&f.dispatcher).unwrap(), None);
        assert_eq!(f.server.key_count(0), 1);
    }

    #[test]
    fn all_locks_name_is_reserved() {
        let f = fixture(LockConfig::default());

        assert!(!f.locks.acquire(&f.dispatcher, "all_locks", 10).unwrap());
        assert!(!f.locks.release(&f.dispatcher, "all_locks").unwrap());
        assert_eq!(
            f.locks.status(&f.dispatcher, "all_locks").unwrap(),
            LockState::Free
        );

        assert!(f.locks.acquire(&f.dispatcher, "b", 10).unwrap());
        let members = f
            .dispatcher
            .invoke("smembers", |h| h.smembers("app_lock:all_locks"))
            .unwrap();
        assert_eq!(members, vec![b"b".to_vec()]);
    }

    #[test]
    fn sweep_guard_name_is_an_ordinary_lock() {
        let f = fixture(LockConfig::default());

        assert!(f.locks.acquire(&f.dispatcher, "a", 10).unwrap());
        assert!(f.locks.acquire(&f.dispatcher, "sweep_guard", 10).unwrap());
        assert!(!f.locks.acquire(&f.dispatcher, "sweep_guard", 10).unwrap());
    }

    #[test]
    fn failed_sweep_does_not_undo_acquire() {
        let f = fixture(LockConfig::default());
        f.dispatcher
            .invoke("lpush", |h| h.lpush("app_lock_sweep_guard", b"x"))
            .unwrap();

        assert!(f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
        assert_eq!(
            f.locks.status(&f.dispatcher, "foo").unwrap(),
            LockState::Held {
                expires_at: Some(T0 + 10)
            }
        );
        assert!(!f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
    }

    #[test]
    fn failed_tracking_does_not_undo_acquire() {
        let f = fixture(LockConfig::default());
        f.dispatcher
            .invoke("set", |h| h.set("app_lock:all_locks", b"x"))
            .unwrap();

        assert!(f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
        assert!(!f.locks.acquire(&f.dispatcher, "foo", 10).unwrap());
    }

    #[test]
    fn store_errors_propagate() {
        let f = fixture(LockConfig::default());
        f.dispatcher
            .invoke("lpush", |h| h.lpush("app_lock:all_locks", b"x"))
            .unwrap();

        assert!(f.locks.sweep(&f.dispatcher).is_err());
    }
}
