//! Measurement types returned by speedtest clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Number of bytes in one mebibyte.
pub const BYTES_PER_MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Public identity of the measuring host as seen by the speedtest service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Public IP address
    pub ip: String,

    /// Internet service provider name
    pub isp: String,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,
}

/// Speedtest server identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ServerId {
    fn from(id: u64) -> Self {
        ServerId(id)
    }
}

/// A candidate speedtest server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server identifier
    pub id: ServerId,

    /// Display name (usually the city)
    pub name: String,

    /// Organisation hosting the server
    pub sponsor: String,

    /// Country the server is located in
    pub country: String,

    /// Host and port
    pub host: String,

    /// Upload endpoint; the other test resources live next to it
    pub url: String,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Great-circle distance from the measuring host in kilometres
    pub distance: f64,
}

/// Outcome of a successful ping sub-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingResult {
    /// Round-trip latency
    pub latency: Duration,
}

impl PingResult {
    /// Create a ping result from a measured latency
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

/// Outcome of a successful download or upload sub-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputResult {
    /// Transfer rate in bytes per second
    pub bytes_per_second: f64,
}

impl ThroughputResult {
    /// Create a result from a rate already expressed in bytes per second
    pub fn from_bytes_per_second(bytes_per_second: f64) -> Self {
        Self { bytes_per_second }
    }

    /// Create a result from a rate in MiB/s (`x * 1024 * 1024`)
    pub fn from_mebibytes_per_second(mebibytes_per_second: f64) -> Self {
        Self {
            bytes_per_second: mebibytes_per_second * BYTES_PER_MEBIBYTE,
        }
    }

    /// Derive the rate from a completed transfer.
    ///
    /// A zero elapsed time yields a rate of zero rather than infinity.
    pub fn from_transfer(bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let bytes_per_second = if secs > 0.0 { bytes as f64 / secs } else { 0.0 };
        Self { bytes_per_second }
    }

    /// Transfer rate in MiB/s
    pub fn mebibytes_per_second(&self) -> f64 {
        self.bytes_per_second / BYTES_PER_MEBIBYTE
    }
}
