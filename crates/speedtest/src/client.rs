//! Measurement client abstraction.

use crate::types::{Identity, PingResult, Server, ThroughputResult};
use async_trait::async_trait;
use common::Result;

/// Source of speedtest measurements.
///
/// Every call is expected to bound its own duration; callers apply no
/// timeout of their own.
#[async_trait]
pub trait MeasurementClient: Send + Sync {
    /// Fetch the public identity (IP, ISP, location) of this host
    async fn fetch_identity(&self) -> Result<Identity>;

    /// Fetch candidate servers ordered by ascending distance from `identity`
    async fn fetch_servers(&self, identity: &Identity) -> Result<Vec<Server>>;

    /// Measure round-trip latency to `server`
    async fn ping(&self, server: &Server) -> Result<PingResult>;

    /// Measure download throughput from `server`
    async fn download(&self, server: &Server) -> Result<ThroughputResult>;

    /// Measure upload throughput to `server`
    async fn upload(&self, server: &Server) -> Result<ThroughputResult>;

    /// Get the name of this client
    fn name(&self) -> &'static str;
}
