//! Tracing and OpenTelemetry initialisation.
//!
//! Call [`init_tracing`] once at startup with the loaded
//! [`TelemetryConfig`].  `RUST_LOG` takes precedence over the configured
//! filter.  When an OTLP endpoint is configured every span, including the
//! `#[instrument]`ed affection queries, is exported over OTLP/HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! use omnisim_runtime::config::TelemetryConfig;
//!
//! // Hold the guard for the whole process lifetime.
//! let _guard = omnisim_runtime::telemetry::init_tracing(&TelemetryConfig::default());
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, TelemetryConfig};

// ────────────────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────────────────

/// Install the global subscriber: `EnvFilter`, compact or JSON formatting,
/// and an OTLP layer when `cfg.otlp_endpoint` is set.
///
/// A second call in the same process leaves the first subscriber in place.
pub fn init_tracing(cfg: &TelemetryConfig) -> TracerProviderGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    let json = cfg.log_format == LogFormat::Json;
    let provider = cfg
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(&cfg.service_name, endpoint));

    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(cfg.service_name.clone()))
    });
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
    };
    if let Err(e) = installed {
        eprintln!("[omnisim] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

// ────────────────────────────────────────────────────────────────────────────
// RAII guard
// ────────────────────────────────────────────────────────────────────────────

/// Shuts the OTel [`SdkTracerProvider`] down on drop, flushing pending spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[omnisim] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// `None` when the exporter cannot be built; the caller then logs to the
/// console only.
fn build_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[omnisim] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // The simple exporter needs no running Tokio runtime at init time.
            .with_simple_exporter(exporter)
            .build(),
    )
}
