//! # rediguard Store
//!
//! Store handle trait and connectors for rediguard.
//!
//! This crate provides the lowest-level abstraction over the backing
//! key-value store. Handles are **dumb pipes**: they forward keys and
//! values untouched and report errors with enough detail to tell a lost
//! connection apart from everything else.
//!
//! ## Design Principles
//!
//! - One trait method per store primitive the wrapper actually uses
//! - No knowledge of key prefixes, value encoding or lock records
//! - [`StoreError::Disconnected`] is the only transient error class
//! - Connectors open transports; auth and db selection happen on the handle
//!
//! ## Available Connectors
//!
//! - [`MemoryConnector`] - In-process [`InMemoryServer`] with fault injection
//! - `RedisConnector` - Redis via the `redis` crate (feature `redis`)
//!
//! ## Example
//!
//! ```rust
//! use rediguard_store::{ConnectOptions, Connector, InMemoryServer, MemoryConnector, StoreClient};
//!
//! let connector = MemoryConnector::new(InMemoryServer::new());
//! let mut handle = connector.connect(&ConnectOptions::new("127.0.0.1", 6379)).unwrap();
//! assert!(handle.set_nx("lock:demo", b"1700000000").unwrap());
//! assert!(!handle.set_nx("lock:demo", b"1700000000").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_client;

pub use backend::{ConnectOptions, Connector, StoreClient};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryServer, MemoryClient, MemoryConnector};
#[cfg(feature = "redis")]
pub use redis_client::{RedisClient, RedisConnector};
