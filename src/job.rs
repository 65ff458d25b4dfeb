//! Jobs as returned by reserve and peek.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::codec::{JsonCodec, MsgPackCodec};
use crate::error::Result;

/// A job id and a copy of its body.
///
/// Job state lives on the server; this is a snapshot taken when the job was
/// reserved or peeked. Act on it through its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Server-assigned job id.
    pub id: u64,
    /// Body bytes, exactly as put.
    pub body: Bytes,
}

impl Job {
    /// Create a job.
    pub fn new(id: u64, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            body: body.into(),
        }
    }

    /// Decode the body as MsgPack.
    pub fn decode_msgpack<T: DeserializeOwned>(&self) -> Result<T> {
        MsgPackCodec::decode(&self.body)
    }

    /// Decode the body as JSON.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        JsonCodec::decode(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body() {
        let job = Job::new(3, MsgPackCodec::encode(&(1u8, "a")).unwrap());
        let (n, s): (u8, String) = job.decode_msgpack().unwrap();
        assert_eq!((n, s.as_str()), (1, "a"));

        let job = Job::new(4, &b"{\"n\":2}"[..]);
        let value: serde_json::Value = job.decode_json().unwrap();
        assert_eq!(value["n"], 2);
    }
}
