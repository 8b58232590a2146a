//! # rediguard Core
//!
//! Resilient, namespaced key-value client with advisory locks.
//!
//! This crate provides:
//! - Connection management with auth, db selection and a probe read
//! - A dispatcher that hides dropped connections by reconnecting and retrying
//! - Prefix-based key namespacing
//! - Advisory locks built on create-if-absent, with stale-lock sweeping
//! - A typed facade over strings, lists, sets, hashes and pub/sub
//!
//! ## Example
//!
//! ```rust
//! use rediguard_core::{Client, ClientConfig, Value};
//! use rediguard_store::{InMemoryServer, MemoryConnector};
//!
//! let server = InMemoryServer::new();
//! let config = ClientConfig::default().with_prefix("app_");
//! let client = Client::new(config, MemoryConnector::new(server)).unwrap();
//!
//! client.set("name", "zhangsan", None).unwrap();
//! assert_eq!(client.get("name", "default").unwrap(), Value::from("zhangsan"));
//!
//! assert!(client.lock("foo", 10).unwrap());
//! assert!(!client.lock("foo", 10).unwrap());
//! assert!(client.unlock("foo").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod clock;
mod config;
mod connection;
mod dispatch;
mod error;
mod keys;
mod lock;

pub use client::Client;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, LockConfig, ReconnectPolicy};
pub use connection::{ConnectionManager, PROBE_KEY};
pub use dispatch::{CancellationToken, DispatchStats, Dispatcher};
pub use error::{CoreError, CoreResult};
pub use keys::KeyCodec;
pub use lock::{LockManager, LockState};

pub use rediguard_codec::Value;
