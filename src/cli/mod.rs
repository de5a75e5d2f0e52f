//! # VSCTL CLI
//!
//! Command-line interface for inspecting VaultService resources and the
//! status the controller publishes for them.
//!
//! ## Usage
//!
//! ```bash
//! # List all VaultService resources
//! vsctl list
//!
//! # Show the status of one VaultService
//! vsctl status example --namespace vault-system
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;

mod list;
mod status;

/// Vault Status Controller CLI
#[derive(Parser)]
#[command(name = "vsctl")]
#[command(
    about = "Inspect VaultService resources and their published cluster status",
    long_about = None,
    after_help = "\
Examples:
  vsctl list
  vsctl list --namespace vault-system
  vsctl status example --namespace vault-system
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to all namespaces for list, `default` otherwise)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List VaultService resources
    List,
    /// Show the status of a VaultService resource
    Status {
        /// Name of the VaultService resource
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Same crypto provider as the controller
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vsctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List => list::list_command(client, cli.namespace).await,
        Commands::Status { name } => status::status_command(client, name, cli.namespace).await,
    }
}
