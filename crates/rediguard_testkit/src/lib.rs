//! # rediguard Testkit
//!
//! Test utilities for rediguard.
//!
//! This crate provides:
//! - Client fixtures over an in-memory server with a manual clock
//! - Fault injection: dropped links, outages, flapping servers
//! - Property-based test generators using proptest
//! - Lock contention and reconnect stress helpers
//! - Cross-crate integration helpers and the usage walkthrough
//!
//! ## Usage
//!
//! ```rust
//! use rediguard_testkit::prelude::*;
//!
//! let t = TestClient::new();
//! assert!(t.lock("job", 10).unwrap());
//! t.clock.advance(11);
//! assert!(t.peer().lock("job", 10).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
