//! Scripted measurement client shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use common::{Error, Result};
use speedtest::{
    Identity, MeasurementClient, PingResult, Server, ServerId, ThroughputResult,
};
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of one scripted step
#[derive(Debug, Clone)]
pub enum Step<T> {
    Ok(T),
    Fail(&'static str),
}

impl<T: Clone> Step<T> {
    fn result(&self) -> Result<T> {
        match self {
            Step::Ok(value) => Ok(value.clone()),
            Step::Fail(message) => Err(Error::http(*message)),
        }
    }
}

/// Measurement client that replays fixed outcomes and records which
/// servers the sub-tests ran against
pub struct ScriptedClient {
    pub identity: Step<Identity>,
    pub servers: Step<Vec<Server>>,
    pub ping: Step<PingResult>,
    pub download: Step<ThroughputResult>,
    pub upload: Step<ThroughputResult>,
    /// Delay before the identity lookup answers
    pub delay: Duration,
    pub calls: Mutex<Vec<(&'static str, ServerId)>>,
}

impl ScriptedClient {
    /// Every step succeeds against two servers, `1` being the closest
    pub fn healthy() -> Self {
        Self {
            identity: Step::Ok(identity()),
            servers: Step::Ok(vec![server(1, 3.5), server(2, 12.0)]),
            ping: Step::Ok(PingResult::new(Duration::from_millis(12))),
            download: Step::Ok(ThroughputResult::from_mebibytes_per_second(10.0)),
            upload: Step::Ok(ThroughputResult::from_mebibytes_per_second(5.0)),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(&'static str, ServerId)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, server: &Server) {
        self.calls.lock().unwrap().push((kind, server.id));
    }
}

#[async_trait]
impl MeasurementClient for ScriptedClient {
    async fn fetch_identity(&self) -> Result<Identity> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.identity.result()
    }

    async fn fetch_servers(&self, _identity: &Identity) -> Result<Vec<Server>> {
        self.servers.result()
    }

    async fn ping(&self, server: &Server) -> Result<PingResult> {
        self.record("ping", server);
        self.ping.result()
    }

    async fn download(&self, server: &Server) -> Result<ThroughputResult> {
        self.record("download", server);
        self.download.result()
    }

    async fn upload(&self, server: &Server) -> Result<ThroughputResult> {
        self.record("upload", server);
        self.upload.result()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn identity() -> Identity {
    Identity {
        ip: "203.0.113.7".to_string(),
        isp: "Example Broadband".to_string(),
        lat: 51.5,
        lon: -0.12,
    }
}

pub fn server(id: u64, distance: f64) -> Server {
    Server {
        id: ServerId(id),
        name: format!("server-{id}"),
        sponsor: "Example Hosting".to_string(),
        country: "United Kingdom".to_string(),
        host: format!("s{id}.example.net:8080"),
        url: format!("http://s{id}.example.net:8080/speedtest/upload.php"),
        lat: 51.51,
        lon: -0.13,
        distance,
    }
}

/// Value of the single sample of `metric`, if any
pub fn sample_value(text: &str, metric: &str) -> Option<f64> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(metric)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .collect();
    assert!(lines.len() <= 1, "more than one {metric} sample: {lines:?}");
    lines
        .first()
        .and_then(|line| line.rsplit(' ').next())
        .map(|value| value.parse().unwrap())
}
