//! Speedtest Prometheus exporter
//!
//! Runs a full network speed test each time Prometheus scrapes `/metrics`
//! and reports the outcome as gauges.
//!
//! # Architecture
//!
//! - **Selector**: picks the server to test against from the discovered list
//! - **Scraper**: runs identity lookup, discovery, selection and the three
//!   sub-tests, producing one [`ScrapeResult`]
//! - **Metrics**: turns a [`ScrapeResult`] into the `speedtest_*` families
//! - **HTTP server**: serializes scrapes and bounds them by a timeout
//!
//! Measurements go through [`speedtest::MeasurementClient`], so the pipeline
//! can run against a stub instead of the network.

pub mod args;
pub mod config;
pub mod health;
pub mod http_server;
pub mod metrics;
pub mod scraper;
pub mod selector;
pub mod server;
pub mod telemetry;
pub mod types;

pub use args::Args;
pub use config::{Config, ConfigError};
pub use health::HealthProbe;
pub use http_server::{AppState, MetricsServer};
pub use metrics::SpeedtestMetrics;
pub use scraper::{ScrapeError, Scraper};
pub use selector::{SelectError, select};
pub use server::ExporterServer;
pub use telemetry::{TelemetryGuard, setup_tracing};
pub use types::{ExporterConfig, Measurement, MeasurementLabels, ScrapeResult, SelectionPolicy};
