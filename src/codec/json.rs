//! JSON job payloads using `serde_json`.

use bytes::Bytes;

use crate::error::Result;

/// JSON codec for structured job bodies.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to a compact JSON job body.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    /// Decode a JSON job body.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
