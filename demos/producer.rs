//! Producer - puts a batch of typed jobs into a tube.
//!
//! This example demonstrates:
//! - Connecting with the builder
//! - Putting MsgPack-encoded jobs into a named tube
//! - Delayed jobs
//!
//! # Running
//!
//! ```text
//! beanstalkd -l 127.0.0.1 -p 11300 &
//! RUST_LOG=debug cargo run --example producer
//! ```

use std::time::Duration;

use beanstalk_client::transport::DEFAULT_ADDR;
use beanstalk_client::Connection;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Job body for the "resize" tube.
#[derive(Serialize, Debug)]
struct Resize {
    path: String,
    width: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let addr = std::env::var("BEANSTALK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let mut conn = Connection::builder()
        .connect_timeout(Duration::from_secs(3))
        .connect(addr.as_str())
        .await?;

    let mut tube = conn.tube("resize")?;
    for i in 0..5u32 {
        let job = Resize {
            path: format!("images/{i}.png"),
            width: 320 * (i + 1),
        };
        // Spread the last jobs out so the worker sees delayed jobs too.
        let delay = Duration::from_secs(u64::from(i.saturating_sub(2)));
        let id = tube
            .put_msgpack(&job, 1024, delay, Duration::from_secs(60))
            .await?;
        println!("put job {id}: {job:?}");
    }

    conn.close().await?;
    Ok(())
}
