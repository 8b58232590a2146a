//! Value encoding.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::SERIALIZE_MARKER;

/// Encodes a value into the bytes written to the store.
///
/// Scalars pass through in plain form:
///
/// | Value | Stored as |
/// |-------|-----------|
/// | `Text` / `Bytes` | the bytes themselves |
/// | `Integer` / `Float` | decimal text |
/// | `Bool` | `1` or `0` |
///
/// Everything else is stored as [`SERIALIZE_MARKER`] followed by the CBOR
/// serialization of the value.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn encode(value: &Value) -> CodecResult<Vec<u8>> {
    match value {
        Value::Text(s) => Ok(s.as_bytes().to_vec()),
        Value::Bytes(b) => Ok(b.clone()),
        Value::Integer(n) => Ok(n.to_string().into_bytes()),
        Value::Float(f) => Ok(f.to_string().into_bytes()),
        Value::Bool(b) => Ok(if *b { b"1".to_vec() } else { b"0".to_vec() }),
        Value::Null | Value::Array(_) | Value::Map(_) => encode_tagged(value),
    }
}

fn encode_tagged(value: &Value) -> CodecResult<Vec<u8>> {
    let mut out = SERIALIZE_MARKER.as_bytes().to_vec();
    ciborium::into_writer(value, &mut out)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(out)
}
