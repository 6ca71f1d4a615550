//! HTTP server for the landing page, health check and Prometheus metrics.

use crate::health::HealthProbe;
use crate::metrics::SpeedtestMetrics;
use crate::scraper::Scraper;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Path the metrics are served on
pub const METRICS_PATH: &str = "/metrics";

const LANDING_PAGE: &str = r#"<html>
<head><title>Speedtest Exporter</title></head>
<body>
<h1>Speedtest Exporter</h1>
<p>Metrics page will take approx 40 seconds to load and show results, as the exporter carries out a speedtest when scraped.</p>
<p><a href='/metrics'>Metrics</a></p>
<p><a href='/health'>Health</a></p>
</body>
</html>"#;

/// Shared state for all handlers
pub struct AppState {
    scraper: Arc<Scraper>,
    metrics: Arc<SpeedtestMetrics>,
    health: HealthProbe,
    /// Held for the whole scrape; at most one scrape runs at a time
    scrape_gate: Mutex<()>,
    scrape_timeout: Duration,
}

impl AppState {
    /// Create handler state
    pub fn new(
        scraper: Arc<Scraper>,
        metrics: Arc<SpeedtestMetrics>,
        health: HealthProbe,
        scrape_timeout: Duration,
    ) -> Self {
        Self {
            scraper,
            metrics,
            health,
            scrape_gate: Mutex::new(()),
            scrape_timeout,
        }
    }
}

/// HTTP server for the exporter endpoints
pub struct MetricsServer {
    state: Arc<AppState>,
    /// Listen address
    listen_addr: String,
}

impl MetricsServer {
    /// Create a new metrics server
    pub fn new(state: AppState, listen_addr: String) -> Self {
        Self {
            state: Arc::new(state),
            listen_addr,
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the HTTP server until ctrl-c
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!(listen_addr = %self.listen_addr, "Starting metrics HTTP server");

        let app = self.router();

        // Bind to address
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "Metrics server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Routes for `/`, `/health` and `/metrics`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route("/health", get(health_handler))
        .route(METRICS_PATH, get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Handler for / endpoint
async fn landing_handler() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Handler for /health endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    if state.health.check().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "No Internet Connection").into_response()
    }
}

/// Handler for /metrics endpoint; runs one speedtest per request
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let Ok(_scrape) = state.scrape_gate.try_lock() else {
        warn!("Rejecting scrape, another one is in flight");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "A speedtest is already in progress",
        )
            .into_response();
    };

    let result =
        match tokio::time::timeout(state.scrape_timeout, state.scraper.run_scrape()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_secs = state.scrape_timeout.as_secs_f64(),
                    "Scrape timed out"
                );
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!(
                        "Speedtest exceeded the configured timeout of {:?}",
                        state.scrape_timeout
                    ),
                )
                    .into_response();
            }
        };

    state.metrics.record(&result);

    // Encode metrics to Prometheus text format
    match state.metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}
