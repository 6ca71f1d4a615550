//! Configuration loading and validation for speedtest exporter

use crate::types::{ExporterConfig, SelectionPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub speedtest: SpeedtestSettings,

    #[serde(default)]
    pub health: HealthSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.speedtest.validate()?;
        self.health.validate()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_scrape_timeout")]
    pub scrape_timeout: Duration,
}

/// Measurement settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SpeedtestSettings {
    #[validate(length(min = 1))]
    pub base_url: String,

    /// Pinned server; absent selects the closest one
    pub server_id: Option<u64>,

    /// Fall back to the closest server when the pinned one is missing
    pub server_fallback: bool,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_request_timeout")]
    pub request_timeout: Duration,

    #[validate(range(min = 1, max = 20))]
    pub ping_samples: u32,

    /// Servers requested from discovery; a pinned server outside them is never found
    #[validate(range(min = 1, max = 100))]
    pub server_limit: u32,

    pub correlation_label: bool,
}

/// /health endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HealthSettings {
    #[validate(length(min = 1))]
    pub probe_url: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_health_timeout")]
    pub timeout: Duration,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub service_name: String,
    pub otlp_endpoint: String,
    pub protocol: OtlpProtocol,
}

/// OTLP transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".to_string(),
            scrape_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for SpeedtestSettings {
    fn default() -> Self {
        Self {
            base_url: speedtest::DEFAULT_BASE_URL.to_string(),
            server_id: None,
            server_fallback: false,
            request_timeout: Duration::from_secs(30),
            ping_samples: 3,
            server_limit: speedtest::DEFAULT_SERVER_LIMIT,
            correlation_label: true,
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_url: "https://clients3.google.com/generate_204".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "speedtest-exporter".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
            protocol: OtlpProtocol::Grpc,
        }
    }
}

// Custom validators

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    let trimmed = addr.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("listen_addr_empty"));
    }

    // host:port, the port must be numeric
    match trimmed.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(ValidationError::new("listen_addr_invalid_format")),
    }
}

fn validate_scrape_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let secs = timeout.as_secs();
    if secs < 1 || secs > 600 {
        return Err(ValidationError::new("scrape_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_request_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if millis < 100 || millis > 300_000 {
        return Err(ValidationError::new("request_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_health_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if millis < 100 || millis > 60_000 {
        return Err(ValidationError::new("health_timeout_out_of_range"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/speedtest-exporter/config.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./speedtest-exporter.yaml"));

        paths
            .into_iter()
            .find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/speedtest-exporter/config.yaml"))
    }

    /// Configured log level, defaulting to info
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    /// Convert to the runtime configuration
    pub fn to_exporter_config(&self) -> Result<ExporterConfig, ConfigError> {
        let base_url =
            Url::parse(&self.speedtest.base_url).map_err(|source| ConfigError::InvalidUrl {
                url: self.speedtest.base_url.clone(),
                source,
            })?;

        Ok(ExporterConfig {
            listen_addr: self.server.listen_addr.clone(),
            scrape_timeout: self.server.scrape_timeout,
            selection: SelectionPolicy::from_settings(
                self.speedtest.server_id,
                self.speedtest.server_fallback,
            ),
            correlation_label: self.speedtest.correlation_label,
            base_url,
            request_timeout: self.speedtest.request_timeout,
            ping_samples: self.speedtest.ping_samples,
            server_limit: self.speedtest.server_limit,
            health_probe_url: self.health.probe_url.clone(),
            health_timeout: self.health.timeout,
        })
    }
}
