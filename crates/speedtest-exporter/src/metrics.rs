//! Prometheus metrics for speedtest scrapes.

use crate::types::{Measurement, ScrapeResult};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

/// Prefix applied to every metric name
pub const NAMESPACE: &str = "speedtest";

/// Per-scrape correlation label, present only when enabled
pub const CORRELATION_LABEL: &str = "test_uuid";

/// Labels attached to latency and throughput samples
pub const MEASUREMENT_LABELS: [&str; 10] = [
    "user_lat",
    "user_lon",
    "user_ip",
    "user_isp",
    "server_lat",
    "server_lon",
    "server_id",
    "server_name",
    "server_country",
    "distance",
];

/// Static description of one metric family
///
/// The registry appends a period to `help` when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Name without the namespace prefix
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
    /// Label names besides the correlation label
    pub labels: &'static [&'static str],
}

pub const UP: MetricDescriptor = MetricDescriptor {
    name: "up",
    help: "Was the last speedtest successful",
    labels: &[],
};

pub const SCRAPE_DURATION: MetricDescriptor = MetricDescriptor {
    name: "scrape_duration_seconds",
    help: "Time to perform last speed test",
    labels: &[],
};

pub const LATENCY: MetricDescriptor = MetricDescriptor {
    name: "latency_seconds",
    help: "Measured latency on last speed test",
    labels: &MEASUREMENT_LABELS,
};

pub const DOWNLOAD: MetricDescriptor = MetricDescriptor {
    name: "download_speed_Bps",
    help: "Last download speedtest result",
    labels: &MEASUREMENT_LABELS,
};

pub const UPLOAD: MetricDescriptor = MetricDescriptor {
    name: "upload_speed_Bps",
    help: "Last upload speedtest result",
    labels: &MEASUREMENT_LABELS,
};

/// All families, in registration order
pub const DESCRIPTORS: [MetricDescriptor; 5] = [UP, SCRAPE_DURATION, LATENCY, DOWNLOAD, UPLOAD];

/// Ordered label pairs for one sample
pub type LabelSet = Vec<(&'static str, String)>;

type FloatGauge = Gauge<f64, AtomicU64>;

/// Metrics registry with the five speedtest gauge families
pub struct SpeedtestMetrics {
    /// Prometheus registry
    pub registry: Registry,

    up: Family<LabelSet, FloatGauge>,
    scrape_duration_seconds: Family<LabelSet, FloatGauge>,
    latency_seconds: Family<LabelSet, FloatGauge>,
    download_speed: Family<LabelSet, FloatGauge>,
    upload_speed: Family<LabelSet, FloatGauge>,
}

impl SpeedtestMetrics {
    /// Declare all families once; a scrape may populate any subset of them
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(NAMESPACE);

        let mut register = |descriptor: &MetricDescriptor| {
            let family = Family::<LabelSet, FloatGauge>::default();
            registry.register(descriptor.name, descriptor.help, family.clone());
            family
        };

        let up = register(&UP);
        let scrape_duration_seconds = register(&SCRAPE_DURATION);
        let latency_seconds = register(&LATENCY);
        let download_speed = register(&DOWNLOAD);
        let upload_speed = register(&UPLOAD);

        Self {
            registry,
            up,
            scrape_duration_seconds,
            latency_seconds,
            download_speed,
            upload_speed,
        }
    }

    /// Replace every series with the outcome of `result`.
    ///
    /// Scrape duration is only reported for successful scrapes.
    pub fn record(&self, result: &ScrapeResult) {
        self.clear();

        let test_uuid = result.test_uuid.map(|id| id.to_string());
        let scrape_labels = scrape_label_set(test_uuid.as_deref());

        self.up
            .get_or_create(&scrape_labels)
            .set(if result.success { 1.0 } else { 0.0 });

        if result.success {
            self.scrape_duration_seconds
                .get_or_create(&scrape_labels)
                .set(result.duration.as_secs_f64());
        }

        let families = [
            (&self.latency_seconds, &result.latency),
            (&self.download_speed, &result.download),
            (&self.upload_speed, &result.upload),
        ];
        for (family, measurement) in families {
            if let Some(measurement) = measurement {
                record_measurement(family, test_uuid.as_deref(), measurement);
            }
        }
    }

    /// Encode the registry in Prometheus text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    fn clear(&self) {
        self.up.clear();
        self.scrape_duration_seconds.clear();
        self.latency_seconds.clear();
        self.download_speed.clear();
        self.upload_speed.clear();
    }
}

impl Default for SpeedtestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn record_measurement(
    family: &Family<LabelSet, FloatGauge>,
    test_uuid: Option<&str>,
    measurement: &Measurement,
) {
    family
        .get_or_create(&measurement_label_set(test_uuid, measurement))
        .set(measurement.value);
}

/// Labels for the `up` and scrape duration series
pub fn scrape_label_set(test_uuid: Option<&str>) -> LabelSet {
    test_uuid
        .map(|id| vec![(CORRELATION_LABEL, id.to_string())])
        .unwrap_or_default()
}

/// Labels for a latency or throughput series
pub fn measurement_label_set(test_uuid: Option<&str>, measurement: &Measurement) -> LabelSet {
    let mut labels = scrape_label_set(test_uuid);
    labels.extend(
        MEASUREMENT_LABELS
            .iter()
            .zip(measurement.labels.values())
            .map(|(name, value)| (*name, value.to_string())),
    );
    labels
}
