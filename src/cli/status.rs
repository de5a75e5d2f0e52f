//! # Status Command
//!
//! Command to show the detailed status of a VaultService resource.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use vault_status_controller::crd::VaultService;

/// Show the spec and published cluster status of a VaultService
pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("Status for VaultService '{ns}/{name}'");
    println!();

    let api: Api<VaultService> = Api::namespaced(client, ns);
    let vault = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get VaultService '{ns}/{name}'"))?;

    println!("Resource Information:");
    println!(
        "  Name: {}",
        vault.metadata.name.as_deref().unwrap_or("<unknown>")
    );
    println!(
        "  Namespace: {}",
        vault.metadata.namespace.as_deref().unwrap_or("<unknown>")
    );
    if let Some(uid) = &vault.metadata.uid {
        println!("  UID: {uid}");
    }
    if let Some(finalizers) = &vault.metadata.finalizers {
        println!("  Finalizers: {}", finalizers.join(", "));
    }

    println!();
    println!("Spec:");
    println!("  Nodes: {}", vault.spec.nodes);
    if let Some(version) = &vault.spec.version {
        println!("  Version: {version}");
    }
    if let Some(base_image) = &vault.spec.base_image {
        println!("  Base Image: {base_image}");
    }
    println!("  Suspend Monitoring: {}", vault.spec.suspend_monitoring);

    println!();
    match &vault.status {
        Some(status) => {
            println!("Status:");
            println!("  Initialized: {}", status.initialized);
            if status.has_active_node() {
                println!("  Active Node: {}", status.active_node);
            } else {
                println!("  Active Node: <none>");
            }
            if status.sealed_nodes.is_empty() {
                println!("  Sealed Nodes: <none>");
            } else {
                println!("  Sealed Nodes:");
                for node in &status.sealed_nodes {
                    println!("    - {node}");
                }
            }
        }
        None => {
            println!("Status: No status available (the monitor has not committed a probe cycle yet)");
        }
    }

    Ok(())
}
