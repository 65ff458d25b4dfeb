//! Transport module - opening the byte stream to the server.
//!
//! [`Connection`](crate::Connection) works over any
//! `AsyncRead + AsyncWrite + Unpin` stream. This module provides the TCP
//! case used by [`Connection::connect`](crate::Connection::connect).

mod tcp;

pub use tcp::{connect_tcp, DEFAULT_ADDR, DEFAULT_PORT};
