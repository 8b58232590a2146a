//! Fault injection against the in-memory server.
//!
//! Wraps the server's hooks into timed scenarios: a single dropped link,
//! an outage of fixed length, or a server that flaps up and down.

use rediguard_store::InMemoryServer;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Drives failures on an [`InMemoryServer`].
#[derive(Debug, Clone)]
pub struct FaultInjector {
    server: InMemoryServer,
}

impl FaultInjector {
    /// Creates an injector for `server`.
    pub fn new(server: InMemoryServer) -> Self {
        Self { server }
    }

    /// Breaks the connection used by each of the next `count` commands.
    pub fn drop_connections(&self, count: u32) {
        self.server.drop_next(count);
    }

    /// Takes the server down now and brings it back after `duration`.
    ///
    /// Join the returned handle to wait for the restart.
    pub fn outage(&self, duration: Duration) -> JoinHandle<()> {
        self.server.set_down(true);
        let server = self.server.clone();
        thread::spawn(move || {
            thread::sleep(duration);
            server.set_down(false);
        })
    }

    /// Toggles the server down and up `cycles` times, spending `period` in
    /// each state. The server is up when the handle completes.
    pub fn flap(&self, cycles: u32, period: Duration) -> JoinHandle<()> {
        let server = self.server.clone();
        thread::spawn(move || {
            for _ in 0..cycles {
                server.set_down(true);
                thread::sleep(period);
                server.set_down(false);
                thread::sleep(period);
            }
        })
    }

    /// Takes the server down until [`restore`](Self::restore).
    pub fn kill(&self) {
        self.server.set_down(true);
    }

    /// Brings the server back.
    pub fn restore(&self) {
        self.server.set_down(false);
    }
}
