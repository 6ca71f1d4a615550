//! Main exporter server implementation.

use crate::health::HealthProbe;
use crate::http_server::{AppState, MetricsServer};
use crate::metrics::SpeedtestMetrics;
use crate::scraper::Scraper;
use crate::types::ExporterConfig;
use speedtest::{MeasurementClient, SpeedtestNetClient, SpeedtestNetConfig};
use std::sync::Arc;
use tracing::info;

/// Speedtest exporter server
pub struct ExporterServer {
    config: ExporterConfig,
}

impl ExporterServer {
    /// Create a new exporter server
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    /// Wire the speedtest.net client into the HTTP server
    pub fn build(&self) -> Result<MetricsServer, Box<dyn std::error::Error>> {
        let mut client_config = SpeedtestNetConfig::new(
            self.config.base_url.clone(),
            self.config.request_timeout,
            self.config.ping_samples,
        );
        client_config.server_limit = self.config.server_limit;
        let client = SpeedtestNetClient::new(client_config)?;

        self.build_with_client(Arc::new(client))
    }

    /// Wire an arbitrary measurement client into the HTTP server
    pub fn build_with_client(
        &self,
        client: Arc<dyn MeasurementClient>,
    ) -> Result<MetricsServer, Box<dyn std::error::Error>> {
        let scraper = Arc::new(Scraper::new(
            client,
            self.config.selection,
            self.config.correlation_label,
        ));
        let metrics = Arc::new(SpeedtestMetrics::new());
        let health = HealthProbe::new(
            self.config.health_probe_url.clone(),
            self.config.health_timeout,
        )?;

        info!(probe_url = %health.url(), "Health probe configured");

        let state = AppState::new(scraper, metrics, health, self.config.scrape_timeout);
        Ok(MetricsServer::new(state, self.config.listen_addr.clone()))
    }

    /// Run the server until shutdown
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!(
            listen_addr = %self.config.listen_addr,
            selection = %self.config.selection,
            scrape_timeout_secs = self.config.scrape_timeout.as_secs_f64(),
            base_url = %self.config.base_url,
            "Starting speedtest exporter"
        );

        let server = self.build()?;
        server.run().await?;

        info!("Speedtest exporter stopped");
        Ok(())
    }
}
