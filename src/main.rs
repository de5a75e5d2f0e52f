//! # Vault Status Controller
//!
//! A Kubernetes controller that keeps the `.status` of every `VaultService`
//! resource in line with the live state of its Vault replicas.
//!
//! ## Overview
//!
//! For every `VaultService` the controller runs a background monitor that,
//! every interval:
//!
//! 1. **Checks initialization** through the cluster service address
//! 2. **Discovers replicas** from the labelled Vault pods
//! 3. **Probes each replica** for its own sealed/standby/active state
//! 4. **Publishes the aggregate** (`initialized`, `activeNode`, `sealedNodes`)
//!    with an optimistic-concurrency status update
//!
//! ## Features
//!
//! - **Multi-namespace**: Watches `VaultService` resources across all namespaces
//! - **Finalizer**: Monitors are stopped before a deleted resource goes away
//! - **Prometheus metrics**: Exposed on `/metrics`
//! - **Health probes**: `/healthz` and `/readyz`

use anyhow::Result;
use vault_status_controller::observability;
use vault_status_controller::runtime::{initialization, watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;

    let result = watch_loop::run_watch_loop(
        init.vaults.clone(),
        init.reconciler.clone(),
        init.server_state.clone(),
    )
    .await;

    observability::otel::shutdown_otel(init.otel_tracer_provider);
    result
}
