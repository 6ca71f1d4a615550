//! Scrape orchestration: one full measurement cycle per call.

use crate::selector::{self, SelectError};
use crate::types::{Measurement, MeasurementLabels, ScrapeResult, SelectionPolicy, SubTest};
use speedtest::{Identity, MeasurementClient, Server};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

/// Scrape pipeline errors
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not fetch user information: {0}")]
    IdentityUnavailable(#[source] common::Error),

    #[error("could not fetch server list: {0}")]
    ServerListUnavailable(#[source] common::Error),

    #[error("server not available: {0}")]
    ServerNotAvailable(#[from] SelectError),

    #[error("failed to carry out {kind} test: {source}")]
    SubTestFailed {
        kind: SubTest,
        #[source]
        source: common::Error,
    },
}

impl ScrapeError {
    /// Fatal errors abort the pipeline; sub-test failures only degrade it
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScrapeError::SubTestFailed { .. })
    }
}

/// Runs speedtest scrapes against a measurement client
pub struct Scraper {
    client: Arc<dyn MeasurementClient>,
    policy: SelectionPolicy,
    correlation_label: bool,
}

impl Scraper {
    /// Create a new scraper
    pub fn new(
        client: Arc<dyn MeasurementClient>,
        policy: SelectionPolicy,
        correlation_label: bool,
    ) -> Self {
        Self {
            client,
            policy,
            correlation_label,
        }
    }

    /// Run identity lookup, discovery, selection, ping, download and upload.
    ///
    /// Never fails: fatal errors yield an unsuccessful result with no
    /// values, sub-test failures leave the remaining values in place.
    pub async fn run_scrape(&self) -> ScrapeResult {
        let test_uuid = self.correlation_label.then(Uuid::new_v4);
        let span = info_span!("scrape", test_uuid = ?test_uuid, client = self.client.name());

        self.scrape(test_uuid).instrument(span).await
    }

    async fn scrape(&self, test_uuid: Option<Uuid>) -> ScrapeResult {
        let start = Instant::now();
        debug!(policy = %self.policy, "Starting scrape");

        let (identity, server) = match self.discover().await {
            Ok(found) => found,
            Err(e) => {
                log_failure(&e);
                return ScrapeResult::failed(test_uuid, start.elapsed());
            }
        };

        info!(
            server_id = %server.id,
            server_name = %server.name,
            distance_km = server.distance,
            "Selected server"
        );
        let labels = MeasurementLabels::new(&identity, &server);

        let latency = measured(
            SubTest::Ping,
            self.client.ping(&server).await,
            &labels,
            |r| r.latency.as_secs_f64(),
        );
        let download = measured(
            SubTest::Download,
            self.client.download(&server).await,
            &labels,
            |r| r.bytes_per_second,
        );
        let upload = measured(
            SubTest::Upload,
            self.client.upload(&server).await,
            &labels,
            |r| r.bytes_per_second,
        );

        let success = latency.is_some() && download.is_some() && upload.is_some();
        let duration = start.elapsed();

        info!(
            success,
            duration_secs = duration.as_secs_f64(),
            "Scrape complete"
        );

        ScrapeResult {
            test_uuid,
            success,
            duration,
            latency,
            download,
            upload,
        }
    }

    /// Steps that must all succeed before any sub-test may run
    async fn discover(&self) -> Result<(Identity, Server), ScrapeError> {
        let identity = self
            .client
            .fetch_identity()
            .await
            .map_err(ScrapeError::IdentityUnavailable)?;

        let servers = self
            .client
            .fetch_servers(&identity)
            .await
            .map_err(ScrapeError::ServerListUnavailable)?;

        let server = selector::select(&self.policy, &servers)?;
        Ok((identity, server))
    }
}

fn measured<T>(
    kind: SubTest,
    outcome: common::Result<T>,
    labels: &MeasurementLabels,
    value: impl FnOnce(T) -> f64,
) -> Option<Measurement> {
    match outcome {
        Ok(result) => Some(Measurement {
            value: value(result),
            labels: labels.clone(),
        }),
        Err(source) => {
            log_failure(&ScrapeError::SubTestFailed { kind, source });
            None
        }
    }
}

fn log_failure(e: &ScrapeError) {
    if e.is_fatal() {
        error!(error = %e, "Scrape aborted");
    } else {
        error!(error = %e, "Sub-test failed, continuing");
    }
}
