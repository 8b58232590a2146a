//! Connection manager.

use crate::config::ClientConfig;
use crate::error::{CoreError, CoreResult};
use rediguard_store::{ConnectOptions, Connector, StoreClient, StoreResult};
use std::sync::Arc;

/// Key read right after connecting so a dead link fails at connect time
/// rather than on the caller's first real operation.
pub const PROBE_KEY: &str = "__rediguard_probe__";

/// Owns the single store handle of a client.
///
/// The handle is replaced wholesale on every successful
/// [`connect`](Self::connect); the old one is dropped, never pooled.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    options: ConnectOptions,
    password: String,
    db: u32,
    handle: Option<Box<dyn StoreClient>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("address", &self.options.address())
            .field("db", &self.db)
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl ConnectionManager {
    /// Creates a manager without connecting.
    pub fn new(config: &ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            options: config.connect_options(),
            password: config.password.clone(),
            db: config.db,
            handle: None,
        }
    }

    /// Opens a new handle and makes it current.
    ///
    /// Runs `AUTH` when a password is configured, `SELECT` for a non-zero
    /// database, then one probe read.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] carrying the store's cause. The
    /// current handle is left untouched on failure.
    pub fn connect(&mut self) -> CoreResult<()> {
        match self.open() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::debug!(address = %self.options.address(), db = self.db, "connected");
                Ok(())
            }
            Err(source) => {
                tracing::debug!(
                    address = %self.options.address(),
                    error = %source,
                    "connect attempt failed"
                );
                Err(CoreError::connection(source))
            }
        }
    }

    fn open(&self) -> StoreResult<Box<dyn StoreClient>> {
        let mut handle = self.connector.connect(&self.options)?;
        if !self.password.is_empty() {
            handle.auth(&self.password)?;
        }
        if self.db != 0 {
            handle.select(self.db)?;
        }
        handle.get(PROBE_KEY)?;
        Ok(handle)
    }

    /// Drops the current handle.
    pub fn disconnect(&mut self) {
        self.handle = None;
    }

    /// Returns true if a handle is held.
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// The current handle, if any.
    pub fn handle_mut(&mut self) -> Option<&mut (dyn StoreClient + 'static)> {
        self.handle.as_deref_mut()
    }

    /// `host:port` of the target server.
    pub fn address(&self) -> String {
        self.options.address()
    }
}
