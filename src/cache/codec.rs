//! Value codec: JSON bytes for every cached value.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

const NULL: &[u8] = b"null";

/// Encodes `value` as JSON.
///
/// Values that serialize to `null` (such as `None`) are rejected with
/// [`CacheError::AbsentValue`].
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(value)?;
    if bytes == NULL {
        return Err(CacheError::AbsentValue);
    }
    Ok(bytes)
}

/// Decodes JSON bytes produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
