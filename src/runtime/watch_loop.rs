//! # Watch Loop
//!
//! Controller watch loop over VaultService resources.
//!
//! Runs until SIGINT/SIGTERM. On shutdown the server is marked not ready
//! first, then every status monitor is cancelled and awaited.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::VaultService;
use crate::runtime::error_policy::{handle_controller_error, handle_reconciliation_error};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Run the controller watch loop
///
/// # Errors
/// Currently never fails; the signature leaves room for startup checks.
pub async fn run_watch_loop(
    vaults: Api<VaultService>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
    });

    let watch_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch",
        operation = "watch_loop"
    );

    info!(parent: &watch_span, "Starting controller watch loop...");
    Controller::new(vaults, watcher::Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler.clone())
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    debug!(
                        resource.name = obj.name.as_str(),
                        resource.namespace = obj.namespace.as_deref().unwrap_or_default(),
                        "watch.event.success"
                    );
                }
                Err(e) => handle_controller_error(&e),
            }
        })
        .await;

    server_state.set_ready(false);
    let stopped = reconciler.registry.shutdown().await;
    info!(
        parent: &watch_span,
        "Controller stopped gracefully ({} monitors stopped)",
        stopped.len()
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
