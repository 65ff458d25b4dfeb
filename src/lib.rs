//! # beanstalk-client
//!
//! Async Rust client for the beanstalkd work-queue protocol.
//!
//! Producers put jobs into named tubes; workers reserve jobs from a set of
//! tubes, process them, and delete, release, or bury them. Job state lives
//! on the server; the client only tracks which tube it is using and which
//! tubes it is watching.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): command encoding, reply decoding against an
//!   expected shape, duration rounding, YAML body parsing
//! - **Connection** ([`Connection`]): owns the stream, keeps the used tube
//!   and watched set in sync with the server, dispatches one command at a time
//! - **Tubes** ([`Tube`], [`TubeSet`]): per-tube and per-tube-set operations
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use beanstalk_client::Connection;
//!
//! #[tokio::main]
//! async fn main() -> beanstalk_client::Result<()> {
//!     let mut conn = Connection::connect("127.0.0.1:11300").await?;
//!
//!     conn.tube("emails")?
//!         .put("hello", 1, Duration::ZERO, Duration::from_secs(120))
//!         .await?;
//!
//!     match conn.tube_set(["emails"])?.reserve_with_timeout(Duration::from_secs(5)).await {
//!         Ok(job) => conn.delete(job.id).await?,
//!         Err(e) if e.is_timeout() => println!("nothing to do"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

mod conn;
mod job;
mod tube;
mod tube_set;
mod watch;

#[cfg(test)]
mod test_support;

pub use conn::{CloseHandle, ConnConfig, Connection, ConnectionBuilder, DEFAULT_CONNECT_TIMEOUT};
pub use error::{BeanstalkError, ErrorKind, Result};
pub use job::Job;
pub use tube::{validate_name, PeekState, Tube, DEFAULT_TUBE, MAX_TUBE_NAME_LEN};
pub use tube_set::TubeSet;
pub use watch::{plan as plan_watch, WatchStep};
