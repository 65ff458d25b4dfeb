//! Stats - prints server and per-tube statistics.
//!
//! # Running
//!
//! ```text
//! cargo run --example stats
//! ```

use beanstalk_client::transport::DEFAULT_ADDR;
use beanstalk_client::Connection;
use tracing_subscriber::EnvFilter;

const TUBE_FIELDS: [&str; 4] = [
    "current-jobs-ready",
    "current-jobs-delayed",
    "current-jobs-buried",
    "current-watching",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let addr = std::env::var("BEANSTALK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let mut conn = Connection::connect(addr.as_str()).await?;

    let server = conn.stats().await?;
    for key in ["version", "uptime", "current-connections", "total-jobs"] {
        if let Some(value) = server.get(key) {
            println!("{key}: {value}");
        }
    }

    for name in conn.list_tubes().await? {
        println!("\n[{name}]");
        let stats = conn.tube(name.as_str())?.stats().await?;
        for key in TUBE_FIELDS {
            println!("  {key}: {}", stats.get(key).map_or("-", String::as_str));
        }
    }

    conn.close().await?;
    Ok(())
}
