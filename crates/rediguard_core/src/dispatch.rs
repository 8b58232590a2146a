//! Resilient call dispatcher.
//!
//! Every store operation goes through [`Dispatcher::invoke`]. A call that
//! fails because the connection dropped is never surfaced: the dispatcher
//! drops the dead handle, reconnects, and re-issues the call. Any other
//! error is returned at once.
//!
//! Reconnecting never gives up by itself. After
//! [`ReconnectPolicy::attempts_before_pause`] failed attempts the counter
//! resets and the thread sleeps for [`ReconnectPolicy::pause`], which keeps
//! a down server from being hammered in a tight loop. A
//! [`CancellationToken`] is the only way to stop waiting.

use crate::config::ReconnectPolicy;
use crate::connection::ConnectionManager;
use crate::error::{CoreError, CoreResult};
use parking_lot::{Mutex, RwLock};
use rediguard_store::{StoreClient, StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which a pause checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Stops a reconnect loop, either on request or at a deadline.
///
/// Clones share state: cancelling one cancels all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Creates a token that only fires on [`cancel`](Self::cancel).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also fires once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancels the token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Counters describing dispatcher activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Operations invoked.
    pub calls: u64,
    /// Successful reconnects after a dropped connection.
    pub reconnects: u64,
    /// Failed connect attempts inside reconnect loops.
    pub failed_connects: u64,
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    reconnects: AtomicU64,
    failed_connects: AtomicU64,
}

/// Routes store calls through the connection manager with reconnect.
#[derive(Debug)]
pub struct Dispatcher {
    manager: Mutex<ConnectionManager>,
    policy: ReconnectPolicy,
    cancel: RwLock<Option<CancellationToken>>,
    counters: Counters,
}

impl Dispatcher {
    /// Creates a dispatcher around `manager`.
    pub fn new(manager: ConnectionManager, policy: ReconnectPolicy) -> Self {
        Self {
            manager: Mutex::new(manager),
            policy,
            cancel: RwLock::new(None),
            counters: Counters::default(),
        }
    }

    /// Attaches (or with `None` removes) a cancellation token.
    pub fn set_cancellation(&self, token: Option<CancellationToken>) {
        *self.cancel.write() = token;
    }

    /// Current counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            calls: self.counters.calls.load(Ordering::Relaxed),
            reconnects: self.counters.reconnects.load(Ordering::Relaxed),
            failed_connects: self.counters.failed_connects.load(Ordering::Relaxed),
        }
    }

    /// Opens the initial connection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`]; this path does not retry.
    pub fn connect(&self) -> CoreResult<()> {
        self.manager.lock().connect()
    }

    /// Invokes `call` against the live handle.
    ///
    /// On a transient disconnect the handle is discarded, the connection is
    /// re-established and `call` runs again; this repeats until the call
    /// succeeds or fails for another reason.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Store`] for any non-transient store error
    /// - [`CoreError::Cancelled`] if a token stopped the reconnect loop
    pub fn invoke<T>(
        &self,
        op: &str,
        mut call: impl FnMut(&mut dyn StoreClient) -> StoreResult<T>,
    ) -> CoreResult<T> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        let mut manager = self.manager.lock();
        loop {
            let outcome = match manager.handle_mut() {
                Some(handle) => call(handle),
                None => Err(StoreError::disconnected("no live connection")),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient_disconnect() => {
                    tracing::debug!(op, error = %e, "connection lost, reconnecting");
                    manager.disconnect();
                    self.reconnect(&mut manager)?;
                }
                Err(e) => {
                    tracing::debug!(op, error = %e, "store error");
                    return Err(CoreError::Store(e));
                }
            }
        }
    }

    fn reconnect(&self, manager: &mut ConnectionManager) -> CoreResult<()> {
        let token = self.cancel.read().clone();
        let mut attempts = 0u32;
        loop {
            if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
                tracing::warn!(address = %manager.address(), "reconnect cancelled");
                return Err(CoreError::Cancelled);
            }
            match manager.connect() {
                Ok(()) => {
                    self.counters.reconnects.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(address = %manager.address(), "reconnected");
                    return Ok(());
                }
                Err(_) => {
                    self.counters.failed_connects.fetch_add(1, Ordering::Relaxed);
                    attempts += 1;
                    if attempts >= self.policy.attempts_before_pause {
                        attempts = 0;
                        tracing::warn!(
                            address = %manager.address(),
                            pause = ?self.policy.pause,
                            "reconnect still failing, pausing"
                        );
                        pause(self.policy.pause, token.as_ref());
                    }
                }
            }
        }
    }
}

fn pause(duration: Duration, token: Option<&CancellationToken>) {
    let Some(token) = token else {
        std::thread::sleep(duration);
        return;
    };
    let end = Instant::now() + duration;
    while !token.is_cancelled() {
        let now = Instant::now();
        if now >= end {
            break;
        }
        std::thread::sleep(CANCEL_POLL.min(end - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use rediguard_store::{InMemoryServer, MemoryConnector};
    use std::thread;

    fn dispatcher(server: &InMemoryServer) -> Dispatcher {
        let config = ClientConfig::default();
        let manager =
            ConnectionManager::new(&config, Arc::new(MemoryConnector::new(server.clone())));
        let dispatcher = Dispatcher::new(
            manager,
            ReconnectPolicy::new(3, Duration::from_millis(5)),
        );
        dispatcher.connect().unwrap();
        dispatcher
    }

    #[test]
    fn success_is_returned_unmodified() {
        let server = InMemoryServer::new();
        let dispatcher = dispatcher(&server);

        dispatcher.invoke("set", |h| h.set("k", b"v")).unwrap();
        let value = dispatcher.invoke("get", |h| h.get("k")).unwrap();
        assert_eq!(value, Some(b"v".to_vec()));
        assert_eq!(dispatcher.stats().reconnects, 0);
    }

    #[test]
    fn single_disconnect_is_retried_invisibly() {
        let server = InMemoryServer::new();
        let dispatcher = dispatcher(&server);
        dispatcher.invoke("set", |h| h.set("k", b"v")).unwrap();

        server.drop_next(1);
        let mut attempts = 0;
        let value = dispatcher
            .invoke("get", |h| {
                attempts += 1;
                h.get("k")
            })
            .unwrap();

        assert_eq!(value, Some(b"v".to_vec()));
        assert_eq!(attempts, 2);
        assert_eq!(dispatcher.stats().reconnects, 1);
    }

    #[test]
    fn disconnect_during_retry_is_handled_again() {
        let server = InMemoryServer::new();
        let dispatcher = dispatcher(&server);

        // The reconnect probe consumes one drop, the retried call another.
        server.drop_next(3);
        let value = dispatcher.invoke("get", |h| h.get("k")).unwrap();
        assert_eq!(value, None);
        assert!(dispatcher.stats().reconnects >= 1);
    }

    #[test]
    fn non_transient_error_is_not_retried() {
        let server = InMemoryServer::new();
        let dispatcher = dispatcher(&server);
        dispatcher.invoke("lpush", |h| h.lpush("list", b"x")).unwrap();
        let connects = server.connect_count();

        let mut attempts = 0;
        let err = dispatcher
            .invoke("get", |h| {
                attempts += 1;
                h.get("list")
            })
            .unwrap_err();

        assert!(matches!(err, CoreError::Store(StoreError::WrongType(_))));
        assert_eq!(attempts, 1);
        assert_eq!(server.connect_count(), connects);
    }

    #[test]
    fn waits_for_server_to_come_back() {
        let server = InMemoryServer::new();
        let dispatcher = dispatcher(&server);
        dispatcher.invoke("set", |h| h.set("k", b"v")).unwrap();

        server.set_down(true);
        let restarter = {
            let server = server.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                server.set_down(false);
            })
        };

        let value = dispatcher.invoke("get", |h| h.get("k")).unwrap();
        restarter.join().unwrap();

        assert_eq!(value, Some(b"v".to_vec()));
        let stats = dispatcher.stats();
        assert_eq!(stats.reconnects, 1);
        assert!(stats.failed_connects >= 3);
    }

    #[test]
    fn cancellation_ends_reconnect_loop() {
        let server = InMemoryServer::new();
        let dispatcher = dispatcher(&server);
        dispatcher.set_cancellation(Some(CancellationToken::with_timeout(
            Duration::from_millis(30),
        )));

        server.set_down(true);
        let err = dispatcher.invoke("get", |h| h.get("k")).unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));

        // The next call after the server returns reconnects from scratch.
        server.set_down(false);
        dispatcher.set_cancellation(None);
        assert_eq!(dispatcher.invoke("get", |h| h.get("k")).unwrap(), None);
    }

    #[test]
    fn explicit_cancel_is_shared_by_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
