//! CBOR payload encoding for operation bodies.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a value from CBOR bytes.
///
/// Trailing bytes after the first complete item are rejected.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid encoding of `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    let mut reader = bytes;
    let value = ciborium::from_reader(&mut reader)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    if !reader.is_empty() {
        return Err(CodecError::decoding_failed(format!(
            "{} trailing bytes after CBOR item",
            reader.len()
        )));
    }
    Ok(value)
}
