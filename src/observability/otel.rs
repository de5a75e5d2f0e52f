//! # OpenTelemetry Support
//!
//! Optional Datadog trace export through `datadog-opentelemetry`.
//!
//! Export is enabled only when `DD_API_KEY` is present in the environment.
//! Other `DD_*` variables (`DD_SERVICE`, `DD_VERSION`, `DD_ENV`, `DD_SITE`,
//! `DD_TRACE_AGENT_URL`) are honored when set and defaulted otherwise.

use crate::constants::CONTROLLER_NAME;
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Tracer provider handle for graceful shutdown
#[derive(Debug)]
pub enum TracerProviderHandle {
    /// Datadog tracer provider
    Datadog(opentelemetry_sdk::trace::SdkTracerProvider),
}

/// Initialize Datadog tracing if the environment asks for it
///
/// Returns `Ok(None)` when no Datadog configuration is present. Nothing is
/// logged here since this runs before the tracing subscriber exists; call
/// [`log_otel_status`] once it is installed.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init_otel() -> Result<Option<TracerProviderHandle>> {
    if std::env::var("DD_API_KEY").is_err() {
        return Ok(None);
    }

    set_default_env("DD_SERVICE", CONTROLLER_NAME);
    set_default_env(
        "DD_VERSION",
        &format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("BUILD_GIT_HASH")),
    );
    set_default_env("DD_SITE", "datadoghq.com");
    set_default_env("DD_TRACE_AGENT_URL", "http://localhost:8126");

    let tracer_provider = datadog_opentelemetry::tracing().init();
    Ok(Some(TracerProviderHandle::Datadog(tracer_provider)))
}

/// Report the trace export setup through the installed subscriber
pub fn log_otel_status(
    tracer_provider: Option<&TracerProviderHandle>,
    otlp_endpoint: Option<&str>,
) {
    match tracer_provider {
        Some(TracerProviderHandle::Datadog(_)) => info!(
            service = %std::env::var("DD_SERVICE").unwrap_or_default(),
            version = %std::env::var("DD_VERSION").unwrap_or_default(),
            agent = %std::env::var("DD_TRACE_AGENT_URL").unwrap_or_default(),
            "Datadog OpenTelemetry tracing initialized"
        ),
        None => {
            if let Some(endpoint) = otlp_endpoint {
                warn!(
                    endpoint,
                    "OTEL_EXPORTER_OTLP_ENDPOINT is set but only Datadog export is supported"
                );
            }
        }
    }
}

/// Flush pending spans and shut the tracer provider down
pub fn shutdown_otel(tracer_provider: Option<TracerProviderHandle>) {
    if let Some(TracerProviderHandle::Datadog(provider)) = tracer_provider {
        info!("Shutting down Datadog tracer provider...");
        if let Err(e) = provider.shutdown_with_timeout(Duration::from_secs(5)) {
            warn!("Error shutting down Datadog tracer provider: {}", e);
        }
    }
}

fn set_default_env(key: &str, value: &str) {
    if std::env::var(key).is_err() {
        // Called during startup before any other thread reads the environment
        std::env::set_var(key, value);
    }
}
