//! # List Command
//!
//! Command to list VaultService resources.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use vault_status_controller::crd::VaultService;

/// List VaultService resources with their published status
pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<VaultService> = if let Some(ns) = &namespace {
        println!("Listing VaultService resources in namespace '{ns}'...");
        Api::namespaced(client, ns)
    } else {
        println!("Listing VaultService resources in all namespaces...");
        Api::all(client)
    };

    let vaults = api
        .list(&kube::api::ListParams::default())
        .await
        .context("Failed to list VaultService resources")?;

    if vaults.items.is_empty() {
        println!("No VaultService resources found.");
        return Ok(());
    }

    println!(
        "\n{:<30} {:<20} {:<10} {:<12} {:<24} {:<6}",
        "NAME", "NAMESPACE", "SUSPEND", "INITIALIZED", "ACTIVE", "SEALED"
    );
    println!("{}", "-".repeat(107));

    for vault in vaults.items {
        let name = vault.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = vault.metadata.namespace.as_deref().unwrap_or("<unknown>");
        let suspend = if vault.spec.suspend_monitoring { "Yes" } else { "No" };

        let (initialized, active, sealed) = match &vault.status {
            Some(status) => (
                status.initialized.to_string(),
                if status.has_active_node() {
                    status.active_node.clone()
                } else {
                    "-".to_string()
                },
                status.sealed_nodes.len().to_string(),
            ),
            None => ("Unknown".to_string(), "-".to_string(), "-".to_string()),
        };

        println!("{name:<30} {ns:<20} {suspend:<10} {initialized:<12} {active:<24} {sealed:<6}");
    }

    Ok(())
}
