//! Client configuration.

use crate::error::{CoreError, CoreResult};
use rediguard_store::ConnectOptions;
use std::time::Duration;

/// Configuration for a client instance.
///
/// Built once and handed to [`Client`](crate::Client); it never changes
/// after connect. Loading it from disk is the job of a separate bootstrap
/// step, not of the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Password (empty = no `AUTH`).
    pub password: String,
    /// Database index (0 = no `SELECT`).
    pub db: u32,
    /// Connect timeout (`ZERO` = none).
    pub connect_timeout: Duration,
    /// Default expiry for `set`, in seconds (0 = no expiry).
    pub default_expire: u64,
    /// Reuse a process-wide persistent channel.
    pub persistent: bool,
    /// Prefix prepended to every key.
    pub prefix: String,
    /// Reconnect behaviour after a dropped connection.
    pub reconnect: ReconnectPolicy,
    /// Lock manager settings.
    pub lock: LockConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: String::new(),
            db: 0,
            connect_timeout: Duration::ZERO,
            default_expire: 0,
            persistent: false,
            prefix: String::new(),
            reconnect: ReconnectPolicy::default(),
            lock: LockConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `host:port` with defaults elsewhere.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the database index.
    #[must_use]
    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the default expiry in seconds.
    #[must_use]
    pub fn with_default_expire(mut self, secs: u64) -> Self {
        self.default_expire = secs;
        self
    }

    /// Enables persistent channel reuse.
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Sets the lock configuration.
    #[must_use]
    pub fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    /// Options passed to the connector.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(self.host.clone(), self.port)
            .with_timeout(self.connect_timeout)
            .with_persistent(self.persistent)
            .with_db(self.db)
    }

    /// Checks the configuration for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] describing the first problem.
    pub fn validate(&self) -> CoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(CoreError::configuration("host must not be empty"));
        }
        if self.port == 0 {
            return Err(CoreError::configuration("port must not be 0"));
        }
        if self.reconnect.attempts_before_pause == 0 {
            return Err(CoreError::configuration(
                "reconnect.attempts_before_pause must be at least 1",
            ));
        }
        Ok(())
    }
}

/// How the dispatcher paces reconnect attempts.
///
/// Retries never give up on their own: after `attempts_before_pause`
/// consecutive failures the counter resets and the thread sleeps for
/// `pause`. Attach a [`CancellationToken`](crate::CancellationToken) to
/// bound the total wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Failed attempts allowed before pausing.
    pub attempts_before_pause: u32,
    /// Sleep between bursts of attempts.
    pub pause: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts_before_pause: 1000,
            pause: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(attempts_before_pause: u32, pause: Duration) -> Self {
        Self {
            attempts_before_pause,
            pause,
        }
    }
}

/// Settings for the lock manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// TTL used by [`Client::lock_default`](crate::Client::lock_default), in seconds.
    pub default_ttl: u64,
    /// Also put a store-side expiry on freshly created lock keys.
    pub set_key_expiry: bool,
    /// Minimum time between opportunistic sweeps.
    pub sweep_cooldown: Duration,
    /// How long past its expiry a lock must be before a sweep reclaims it.
    pub sweep_grace: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl: 5,
            set_key_expiry: true,
            sweep_cooldown: Duration::from_secs(300),
            sweep_grace: Duration::from_secs(60),
        }
    }
}

impl LockConfig {
    /// Sets the default TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, secs: u64) -> Self {
        self.default_ttl = secs;
        self
    }

    /// Enables or disables store-side expiry on lock keys.
    #[must_use]
    pub const fn with_key_expiry(mut self, enabled: bool) -> Self {
        self.set_key_expiry = enabled;
        self
    }

    /// Sets the sweep cooldown.
    #[must_use]
    pub const fn with_sweep_cooldown(mut self, cooldown: Duration) -> Self {
        self.sweep_cooldown = cooldown;
        self
    }

    /// Sets the sweep grace period.
    #[must_use]
    pub const fn with_sweep_grace(mut self, grace: Duration) -> Self {
        self.sweep_grace = grace;
        self
    }
}
