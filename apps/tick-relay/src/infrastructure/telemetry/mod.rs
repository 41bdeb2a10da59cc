//! Tracing and OpenTelemetry Setup
//!
//! Structured logs go to stdout through `tracing-subscriber`; when span
//! export is enabled, the same subscriber also ships spans to an
//! OTLP-compatible collector (OpenObserve, Jaeger, ...).
//!
//! # Environment Variables
//!
//! - `OTEL_ENABLED`: "false" disables span export (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint (default: http://localhost:4318)
//! - `OTEL_SERVICE_NAME`: service name on exported spans (default: tick-relay)
//! - `RUST_LOG`: log filter, layered over the built-in directives
//!
//! # Usage
//!
//! ```ignore
//! // The guard flushes and shuts the exporter down when dropped, so it
//! // must live for the whole program.
//! let _guard = tick_relay::infrastructure::telemetry::init();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Service name attached to exported spans.
const DEFAULT_SERVICE_NAME: &str = "tick-relay";

/// Collector endpoint used when none is configured.
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

/// Directives applied under whatever `RUST_LOG` adds: the relay itself at
/// info, the HTTP internals quieted down.
const BASE_DIRECTIVES: [&str; 3] = ["tick_relay=info", "h2=warn", "hyper=warn"];

// =============================================================================
// Configuration
// =============================================================================

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether spans are exported at all.
    pub enabled: bool,
    /// OTLP collector endpoint.
    pub otlp_endpoint: String,
    /// Service name on exported spans.
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Read the telemetry knobs from the environment, falling back to the
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: !std::env::var("OTEL_ENABLED").is_ok_and(|v| v.eq_ignore_ascii_case("false")),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or(defaults.otlp_endpoint),
            service_name: std::env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
        }
    }
}

// =============================================================================
// Guard
// =============================================================================

/// Keeps the OTLP pipeline alive.
///
/// Dropping the guard flushes buffered spans and shuts the exporter down;
/// hold it in `main` until shutdown.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // The subscriber may already be torn down here, so report to stderr
        // directly rather than through tracing.
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("OTLP tracer shutdown failed: {e}");
        }
    }
}

// =============================================================================
// Initialization
// =============================================================================

/// Initialize tracing from the environment.
#[must_use]
pub fn init() -> TelemetryGuard {
    init_with_config(TelemetryConfig::from_env())
}

/// Initialize tracing with an explicit configuration.
///
/// Installs the global subscriber: an env-filtered fmt layer always, plus an
/// OTLP span export layer when `config.enabled` is set.
#[must_use]
#[allow(clippy::expect_used)]
pub fn init_with_config(config: TelemetryConfig) -> TelemetryGuard {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let provider = config.enabled.then(|| {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.otlp_endpoint)
            .build()
            .expect("OTLP exporter construction failed");

        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(
                opentelemetry_sdk::Resource::builder()
                    .with_service_name(config.service_name.clone())
                    .build(),
            )
            .build()
    });

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(config.service_name)));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    TelemetryGuard { provider }
}

#[allow(clippy::expect_used)]
fn env_filter() -> EnvFilter {
    BASE_DIRECTIVES
        .into_iter()
        .fold(EnvFilter::from_default_env(), |filter, directive| {
            filter.add_directive(directive.parse().expect("built-in directive is valid"))
        })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_exports_to_localhost() {
        let config = TelemetryConfig::default();
        assert!(config.enabled);
        assert_eq!(config.otlp_endpoint, DEFAULT_OTLP_ENDPOINT);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn base_directives_parse() {
        for directive in BASE_DIRECTIVES {
            assert!(
                directive.parse::<tracing_subscriber::filter::Directive>().is_ok(),
                "directive {directive} must parse"
            );
        }
    }
}
