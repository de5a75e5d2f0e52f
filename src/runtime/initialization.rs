//! # Initialization
//!
//! Controller initialization logic including rustls setup, OpenTelemetry,
//! tracing, metrics, server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::VaultService;
use crate::observability;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "vault_status_controller=info";

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for VaultService resources in all namespaces
    pub vaults: Api<VaultService>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// OpenTelemetry tracer provider (if initialized)
    pub otel_tracer_provider: Option<observability::otel::TracerProviderHandle>,
    /// Controller configuration
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// # Errors
/// Fails if tracing export, metrics, the HTTP server, the Kubernetes client
/// or the Vault HTTP client cannot be set up.
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection; a provider installed
    // earlier in the process is kept
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ControllerConfig::from_env();

    let otel_tracer_provider =
        observability::otel::init_otel().context("Failed to initialize OpenTelemetry")?;
    init_tracing(config.json_logs(), otel_tracer_provider.is_some());
    observability::otel::log_otel_status(
        otel_tracer_provider.as_ref(),
        std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok().as_deref(),
    );

    info!("Starting Vault Status Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded controller configuration");

    if config.enable_metrics {
        observability::metrics::register_metrics()?;
    } else {
        info!("Metrics collection disabled (ENABLE_METRICS=false)");
    }

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = server_state.clone();
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let vaults: Api<VaultService> = Api::all(client.clone());

    let reconciler = Arc::new(
        Reconciler::new(client.clone(), config.clone())
            .context("Failed to create the Vault HTTP client")?,
    );

    summarize_existing_resources(&vaults).await;

    info!("Controller initialized, starting watch loop...");
    Ok(InitializationResult {
        client,
        vaults,
        reconciler,
        server_state,
        otel_tracer_provider,
        config,
    })
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the default filter. When Datadog export is active its
/// subscriber may already be installed, in which case this is a no-op.
pub fn init_tracing(json: bool, otel_active: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if let Err(e) = result {
        if otel_active {
            warn!("Tracing subscriber already initialized by Datadog: {}", e);
        } else {
            eprintln!("Failed to initialize tracing subscriber: {e}");
        }
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval = Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log the VaultServices present at startup, grouped by namespace
///
/// The controller reconciles them through its initial list; this only gives
/// operators a view of what is about to be monitored.
async fn summarize_existing_resources(vaults: &Api<VaultService>) {
    let list = match vaults.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            warn!(
                "Could not list VaultService resources (is the CRD installed?): {}",
                e
            );
            return;
        }
    };

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for vault in &list.items {
        by_namespace
            .entry(vault.namespace().unwrap_or_default())
            .or_default()
            .push(vault.name_any());
    }

    info!(
        "Found {} existing VaultService resources in {} namespaces",
        list.items.len(),
        by_namespace.len()
    );
    for (namespace, mut names) in by_namespace {
        names.sort();
        info!("  {}: {}", namespace, names.join(", "));
    }
}
