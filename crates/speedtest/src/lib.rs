//! Network speed measurement primitives.
//!
//! This crate discovers speedtest servers and runs the three sub-tests a
//! speed probe needs:
//! - latency (ping)
//! - download throughput
//! - upload throughput
//!
//! Measurements are exposed through the [`MeasurementClient`] trait so
//! callers can swap the speedtest.net backend for a stub in tests. Every
//! sub-test returns a value instead of mutating the server it ran against.
//!
//! # Example
//!
//! ```no_run
//! use speedtest::{MeasurementClient, SpeedtestNetClient, SpeedtestNetConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SpeedtestNetConfig::new(
//!     "https://www.speedtest.net".parse()?,
//!     Duration::from_secs(30),
//!     3,
//! );
//! let client = SpeedtestNetClient::new(config)?;
//!
//! let identity = client.fetch_identity().await?;
//! let servers = client.fetch_servers(&identity).await?;
//! let ping = client.ping(&servers[0]).await?;
//! println!("latency: {:?}", ping.latency);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod geo;
pub mod speedtest_net;
pub mod types;

pub use client::MeasurementClient;
pub use speedtest_net::{
    DEFAULT_BASE_URL, DEFAULT_SERVER_LIMIT, SpeedtestNetClient, SpeedtestNetConfig,
};
pub use types::{Identity, PingResult, Server, ServerId, ThroughputResult};
