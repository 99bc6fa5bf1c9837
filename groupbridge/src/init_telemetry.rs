use anyhow::Result;
use tracing::{info, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, registry, registry::LookupSpan, EnvFilter, Layer};

#[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
pub fn build_otel_layer<S>() -> Result<
    tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>,
    opentelemetry::trace::TraceError,
>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    use init_tracing_opentelemetry::{init_propagator, otlp, resource::DetectResource};
    use opentelemetry::{global, trace::TracerProvider};

    let otel_rsrc = DetectResource::default()
        .with_fallback_service_name(env!("CARGO_PKG_NAME"))
        .with_fallback_service_version(env!("CARGO_PKG_VERSION"))
        .build();
    let tracerprovider = otlp::init_tracerprovider(otel_rsrc, otlp::identity)?;
    init_propagator()?;
    let layer = tracing_opentelemetry::layer()
        .with_error_records_to_exceptions(true)
        .with_tracer(tracerprovider.tracer(""));
    global::set_tracer_provider(tracerprovider);
    Ok(layer)
}

pub fn build_reduced_logger_text<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if cfg!(debug_assertions) {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_line_number(false)
                .with_thread_names(false)
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_target(true)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
                .event_format(tracing_subscriber::fmt::format().compact()),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_target(true),
        )
    }
}

/// Filter directives: `RUST_LOG`, falling back to `OTEL_LOG_LEVEL` and `warn`,
/// with the otel targets kept visible.
pub fn loglevel_directives() -> String {
    format!(
        "{},otel::tracing=trace,otel=debug,axum_tracing_opentelemetry=error",
        std::env::var("RUST_LOG")
            .or_else(|_| std::env::var("OTEL_LOG_LEVEL"))
            .unwrap_or_else(|_| "warn".to_string())
    )
}

pub fn build_loglevel_filter_layer() -> EnvFilter {
    EnvFilter::try_new(loglevel_directives()).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// `telemetry` is a comma separated list, `traces` enables the otel layer
/// when the binary was built with a telemetry feature.
pub fn traces_requested(settings: &Option<String>) -> bool {
    settings
        .as_deref()
        .map(|s| s.to_lowercase().split(',').any(|part| part.trim() == "traces"))
        .unwrap_or(false)
}

pub fn init_telemetry_and_tracing(settings: &Option<String>) -> Result<()> {
    let tracing_enabled = traces_requested(settings);

    #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
    {
        if tracing_enabled {
            let subscriber = registry()
                .with(build_otel_layer()?)
                .with(build_loglevel_filter_layer())
                .with(build_reduced_logger_text());
            tracing::subscriber::set_global_default(subscriber)?;
            info!("init logging & tracing with OpenTelemetry");
            return Ok(());
        }
    }

    let subscriber = registry()
        .with(build_loglevel_filter_layer())
        .with(build_reduced_logger_text());
    tracing::subscriber::set_global_default(subscriber)?;

    if tracing_enabled {
        tracing::warn!("Traces requested, but this build has no telemetry support");
    }
    info!("init logging");
    Ok(())
}
