//! Logging Infrastructure
//!
//! Structured logging plus an in-process OpenTelemetry tracer so spans carry
//! real trace ids that can be propagated to peers.

use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use super::propagation::install_propagator;

/// Logger options, usually read from `RUST_LOG`, `LOG_JSON` and `LOG_DIR`
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Fallback filter when `RUST_LOG` is unset
    pub default_filter: Option<String>,
    pub json: bool,
    /// Daily rolling file output when the directory exists
    pub log_dir: Option<String>,
}

impl LogOptions {
    pub fn from_env() -> Self {
        Self {
            default_filter: None,
            json: crate::config::env_parse("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Keeps the tracer provider and file writer alive for the process lifetime
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
    _file_guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    /// Flush and shut down the tracer provider
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::error!(error = %e, "failed to shutdown tracer provider");
        }
    }
}

/// Initialize the logger for `service_name`
pub fn init_logger(service_name: &str, options: &LogOptions) -> TelemetryGuard {
    install_propagator();

    let provider = SdkTracerProvider::builder().build();
    let tracer = provider.tracer(service_name.to_string());
    global::set_tracer_provider(provider.clone());

    let default_filter = options.default_filter.clone().unwrap_or_else(|| {
        format!(
            "{}=info,shared=info,tower_http=info",
            service_name.replace('-', "_")
        )
    });
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (writer, file_guard) = match options.log_dir.as_deref() {
        Some(dir) if Path::new(dir).exists() => {
            let appender = tracing_appender::rolling::daily(dir, service_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        _ => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    let result = if options.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(writer),
            )
            .try_init()
    };

    if let Err(e) = result {
        // Already initialized (tests, embedded runs): keep the existing subscriber
        tracing::debug!(error = %e, "logger already initialized");
    }

    TelemetryGuard {
        provider,
        _file_guard: file_guard,
    }
}
