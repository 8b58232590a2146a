//! # rediguard Codec
//!
//! Value encoding for rediguard.
//!
//! Values written through rediguard are either **scalars**, which the
//! store sees in their natural byte form, or **composites**, which are
//! serialized to CBOR and tagged with a marker prefix so they can be told
//! apart on read.
//!
//! ## Rules
//!
//! - `encode(v) == v`'s plain bytes for every scalar `v`
//! - `decode(encode(v)) == v` for every composite `v`
//! - A missing value or malformed payload decodes to the caller's default
//! - Plain text that starts with the marker is read as a (broken) payload
//!
//! ## Usage
//!
//! ```
//! use rediguard_codec::{decode, encode, Value};
//!
//! let value = Value::from(vec!["golf", "coding"]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(decode(Some(&bytes), Value::Null), value);
//!
//! assert_eq!(encode(&Value::from(100i64)).unwrap(), b"100");
//! assert_eq!(decode(None, Value::from(20i64)), Value::from(20i64));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{decode, try_decode};
pub use encoder::encode;
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Prefix that marks a serialized composite value.
pub const SERIALIZE_MARKER: &str = "redis_serialize:";
