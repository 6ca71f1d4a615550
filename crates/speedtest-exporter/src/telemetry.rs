//! OpenTelemetry integration for distributed tracing
//!
//! Each scrape runs inside a `scrape` span; with telemetry enabled those spans
//! are exported over OTLP alongside the regular log output.

use crate::config::{LogFormat, OtlpProtocol, TelemetrySettings};
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
};
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Build the OTLP tracer described by `settings`.
///
/// Returns `None` when telemetry is disabled. Must be called from within a
/// Tokio runtime since the batch exporter spawns onto it.
pub fn init_tracer(
    settings: &TelemetrySettings,
) -> Result<Option<(Tracer, TelemetryGuard)>, Box<dyn std::error::Error>> {
    if !settings.enabled {
        return Ok(None);
    }

    let exporter = match settings.protocol {
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&settings.otlp_endpoint)
            .build()?,
        OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&settings.otlp_endpoint)
            .build()?,
    };

    let resource = Resource::new(vec![
        KeyValue::new("service.name", settings.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build();

    let tracer = provider.tracer("speedtest-exporter");
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Some((tracer, TelemetryGuard)))
}

/// Install the global subscriber, with an OpenTelemetry layer when enabled.
///
/// The returned guard must be kept alive for the duration of the program.
pub fn setup_tracing(
    settings: &TelemetrySettings,
    log_level: &str,
    format: LogFormat,
) -> Result<Option<TelemetryGuard>, Box<dyn std::error::Error>> {
    let Some((tracer, guard)) = init_tracer(settings)? else {
        match format {
            LogFormat::Text => common::logging::init(log_level),
            LogFormat::Json => common::logging::init_json(log_level),
        }
        tracing::info!("Tracing initialized without OpenTelemetry");
        return Ok(None);
    };

    let fmt_layer = match format {
        LogFormat::Text => fmt::layer().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(common::logging::env_filter(log_level))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!(
        service_name = %settings.service_name,
        otlp_endpoint = %settings.otlp_endpoint,
        protocol = ?settings.protocol,
        "Tracing initialized with OpenTelemetry integration"
    );

    Ok(Some(guard))
}
