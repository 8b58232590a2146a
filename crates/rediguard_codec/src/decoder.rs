//! Value decoding.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::SERIALIZE_MARKER;

/// Decodes bytes read from the store.
///
/// Tagged payloads are deserialized; anything else comes back as `Text`
/// when it is valid UTF-8 and as `Bytes` otherwise.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if a tagged payload is malformed.
pub fn try_decode(raw: &[u8]) -> CodecResult<Value> {
    match raw.strip_prefix(SERIALIZE_MARKER.as_bytes()) {
        Some(payload) => ciborium::from_reader(payload)
            .map_err(|e| CodecError::decoding_failed(e.to_string())),
        None => Ok(match String::from_utf8(raw.to_vec()) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Bytes(e.into_bytes()),
        }),
    }
}

/// Decodes an optional stored value, falling back to `default`.
///
/// A missing value or a malformed tagged payload yields `default`; this
/// function never fails.
pub fn decode(raw: Option<&[u8]>, default: Value) -> Value {
    let Some(raw) = raw else {
        return default;
    };
    match try_decode(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "malformed tagged value, using default");
            default
        }
    }
}
