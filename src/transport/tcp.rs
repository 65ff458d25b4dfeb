//! TCP transport.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use beanstalk_client::transport::connect_tcp;
//!
//! let stream = connect_tcp("127.0.0.1:11300", Some(Duration::from_secs(5))).await?;
//! ```

use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{BeanstalkError, Result};

/// Default server port.
pub const DEFAULT_PORT: u16 = 11300;

/// Default server address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:11300";

/// Open a TCP stream to `addr`, bounded by `timeout` if given.
///
/// Nagle is disabled: every exchange is a small request followed by a wait
/// for the reply.
pub async fn connect_tcp<A: ToSocketAddrs>(addr: A, timeout: Option<Duration>) -> Result<TcpStream> {
    let stream = match timeout {
        Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                BeanstalkError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", limit),
                ))
            })??,
        None => TcpStream::connect(addr).await?,
    };

    stream.set_nodelay(true)?;
    if let Ok(peer) = stream.peer_addr() {
        tracing::debug!(%peer, "connected");
    }
    Ok(stream)
}
