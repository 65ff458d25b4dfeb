//! MsgPack job payloads using `rmp-serde`.
//!
//! Structs are written with `to_vec_named` so fields travel as a map keyed by
//! name. Workers in other languages can then decode the payload without
//! sharing field order with the producer.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct ResizeImage {
//!     path: String,
//!     width: u32,
//! }
//!
//! let job = ResizeImage { path: "a.png".to_string(), width: 640 };
//! let body = MsgPackCodec::encode(&job).unwrap();
//! let decoded: ResizeImage = MsgPackCodec::decode(&body).unwrap();
//! assert_eq!(decoded, job);
//! ```

use bytes::Bytes;

use crate::error::Result;

/// MessagePack codec for structured job bodies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to a MsgPack job body.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Bytes> {
        Ok(Bytes::from(rmp_serde::to_vec_named(value)?))
    }

    /// Decode a MsgPack job body.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BeanstalkError;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct SendEmail {
        to: String,
        template: String,
        retries: u8,
    }

    #[test]
    fn test_encode_decode_struct() {
        let job = SendEmail {
            to: "ops@example.com".to_string(),
            template: "welcome".to_string(),
            retries: 3,
        };

        let body = MsgPackCodec::encode(&job).unwrap();
        let decoded: SendEmail = MsgPackCodec::decode(&body).unwrap();

        assert_eq!(decoded, job);
    }

    #[test]
    fn test_structs_encode_as_maps() {
        let job = SendEmail {
            to: "x".to_string(),
            template: "y".to_string(),
            retries: 0,
        };

        let body = MsgPackCodec::encode(&job).unwrap();

        // 0x83 is a fixmap with three entries; positional encoding would be 0x93.
        assert_eq!(body[0], 0x83);
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<SendEmail> = MsgPackCodec::decode(b"not msgpack");
        assert!(matches!(result, Err(BeanstalkError::MsgPackDecode(_))));
    }
}
