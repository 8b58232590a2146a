//! Shared helpers for the rediguard benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
