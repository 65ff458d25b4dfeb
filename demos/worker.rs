//! Worker - reserves jobs from several tubes until Ctrl-C.
//!
//! This example demonstrates:
//! - Reserving from a tube set with a timeout
//! - Telling `TIMED_OUT` and `DEADLINE_SOON` apart from real failures
//! - Unblocking a pending reservation with a `CloseHandle`
//!
//! # Running
//!
//! ```text
//! RUST_LOG=beanstalk_client=debug cargo run --example worker
//! ```

use std::time::Duration;

use beanstalk_client::transport::DEFAULT_ADDR;
use beanstalk_client::{BeanstalkError, Connection};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Debug)]
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
    let mut conn = Connection::connect(addr.as_str()).await?;

    let closer = conn.close_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            closer.close();
        }
    });

    loop {
        let reserved = conn
            .tube_set(["resize", "default"])?
            .reserve_with_timeout(Duration::from_secs(5))
            .await;

        let job = match reserved {
            Ok(job) => job,
            Err(e) if e.is_timeout() => {
                println!("no jobs for 5s");
                continue;
            }
            Err(e) if e.is_deadline_soon() => {
                println!("a reserved job is about to expire");
                continue;
            }
            Err(BeanstalkError::ConnectionClosed) => break,
            Err(e) => return Err(e.into()),
        };

        match job.decode_msgpack::<Resize>() {
            Ok(resize) => {
                println!("job {}: resize {} to {}px", job.id, resize.path, resize.width);
                conn.delete(job.id).await?;
            }
            Err(e) => {
                println!("job {}: undecodable body ({e}), burying", job.id);
                conn.bury(job.id, 0).await?;
            }
        }
    }

    println!("shutting down");
    Ok(())
}
