//! Codec module - structured job bodies.
//!
//! Job bodies are opaque bytes to the server and to the protocol engine.
//! These helpers turn typed values into bodies and back:
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (struct-as-map)
//! - [`JsonCodec`] - JSON using `serde_json`
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so the codec is picked at compile time at each call site.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::codec::{JsonCodec, MsgPackCodec};
//!
//! let body = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&body).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let body = JsonCodec::encode(&vec![1, 2, 3]).unwrap();
//! assert_eq!(&body[..], b"[1,2,3]");
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
