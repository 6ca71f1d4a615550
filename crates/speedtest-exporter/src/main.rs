//! Speedtest exporter binary

use clap::Parser;
use speedtest_exporter::{Args, Config, ExporterServer, setup_tracing};
use validator::Validate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration first (needed for logging and telemetry settings)
    let loaded = match &args.config {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    };
    let (mut config, load_error) = match loaded {
        Ok(cfg) => (cfg, None),
        // An explicitly requested file must load
        Err(e) if args.config.is_some() => return Err(e.into()),
        Err(e) => (Config::default(), Some(e)),
    };
    args.apply(&mut config);
    config.validate()?;

    let log_format = config.logging.format.unwrap_or_default();
    let _telemetry_guard = setup_tracing(&config.telemetry, config.log_level(), log_format)?;

    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Configuration error, using defaults");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Speedtest exporter starting");

    let exporter_config = config.to_exporter_config()?;
    ExporterServer::new(exporter_config).run().await?;

    // Telemetry guard will flush spans on drop

    Ok(())
}
