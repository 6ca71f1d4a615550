//! Types shared by the scrape pipeline and the metrics emitter.

use speedtest::{Identity, Server, ServerId};
use std::fmt;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// How the server to test against is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Always use the closest server
    Closest,

    /// Use a specific server, optionally falling back to the closest one
    Pinned {
        id: ServerId,
        fallback_allowed: bool,
    },
}

impl SelectionPolicy {
    /// Build a policy from the `server_id` / `server_fallback` settings
    pub fn from_settings(server_id: Option<u64>, fallback_allowed: bool) -> Self {
        match server_id {
            Some(id) => SelectionPolicy::Pinned {
                id: ServerId(id),
                fallback_allowed,
            },
            None => SelectionPolicy::Closest,
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Closest => write!(f, "closest"),
            SelectionPolicy::Pinned {
                id,
                fallback_allowed,
            } => write!(f, "pinned({}, fallback={})", id, fallback_allowed),
        }
    }
}

/// Exporter runtime configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Address the HTTP listener binds to
    pub listen_addr: String,

    /// Deadline for a whole scrape
    pub scrape_timeout: Duration,

    /// Server selection policy
    pub selection: SelectionPolicy,

    /// Attach a per-scrape `test_uuid` label to every sample
    pub correlation_label: bool,

    /// speedtest.net base URL
    pub base_url: Url,

    /// Timeout for each measurement request
    pub request_timeout: Duration,

    /// Latency samples per ping sub-test
    pub ping_samples: u32,

    /// Servers requested from discovery; a pinned server must be among them
    pub server_limit: u32,

    /// URL probed by the /health endpoint
    pub health_probe_url: String,

    /// Timeout for the health probe
    pub health_timeout: Duration,
}

/// One of the three measurements run per scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTest {
    Ping,
    Download,
    Upload,
}

impl fmt::Display for SubTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubTest::Ping => write!(f, "ping"),
            SubTest::Download => write!(f, "download"),
            SubTest::Upload => write!(f, "upload"),
        }
    }
}

/// Label values describing who measured against which server
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementLabels {
    pub user_lat: String,
    pub user_lon: String,
    pub user_ip: String,
    pub user_isp: String,
    pub server_lat: String,
    pub server_lon: String,
    pub server_id: String,
    pub server_name: String,
    pub server_country: String,
    pub distance: String,
}

impl MeasurementLabels {
    /// Capture the label values for a measurement
    pub fn new(identity: &Identity, server: &Server) -> Self {
        Self {
            user_lat: identity.lat.to_string(),
            user_lon: identity.lon.to_string(),
            user_ip: identity.ip.clone(),
            user_isp: identity.isp.clone(),
            server_lat: server.lat.to_string(),
            server_lon: server.lon.to_string(),
            server_id: server.id.to_string(),
            server_name: server.name.clone(),
            server_country: server.country.clone(),
            distance: format!("{:.6}", server.distance),
        }
    }

    /// Label values in the order of [`crate::metrics::MEASUREMENT_LABELS`]
    pub fn values(&self) -> [&str; 10] {
        [
            self.user_lat.as_str(),
            self.user_lon.as_str(),
            self.user_ip.as_str(),
            self.user_isp.as_str(),
            self.server_lat.as_str(),
            self.server_lon.as_str(),
            self.server_id.as_str(),
            self.server_name.as_str(),
            self.server_country.as_str(),
            self.distance.as_str(),
        ]
    }
}

/// A single recorded value with the labels captured when it was measured
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub labels: MeasurementLabels,
}

/// Everything one scrape produced
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    /// Correlates all samples of one scrape
    pub test_uuid: Option<Uuid>,

    /// True only if every step of the pipeline succeeded
    pub success: bool,

    /// Wall-clock time of the whole cycle
    pub duration: Duration,

    /// Latency in seconds
    pub latency: Option<Measurement>,

    /// Download throughput in bytes per second
    pub download: Option<Measurement>,

    /// Upload throughput in bytes per second
    pub upload: Option<Measurement>,
}

impl ScrapeResult {
    /// A failed scrape that produced no values
    pub fn failed(test_uuid: Option<Uuid>, duration: Duration) -> Self {
        Self {
            test_uuid,
            success: false,
            duration,
            latency: None,
            download: None,
            upload: None,
        }
    }

    /// Which metric kinds carry a value, for comparing scrape shapes
    pub fn populated(&self) -> [bool; 3] {
        [
            self.latency.is_some(),
            self.download.is_some(),
            self.upload.is_some(),
        ]
    }
}
