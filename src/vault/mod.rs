//! # Vault Endpoint Client
//!
//! Read-only access to the Vault status API.
//!
//! - [`VaultEndpoint`] is the seam the monitor and prober talk to
//! - [`EndpointConnector`] binds an endpoint to one `host:port`
//! - [`client`] provides the reqwest-backed implementation

pub mod client;
pub mod types;

pub use client::{HttpEndpointConnector, VaultHttpClient};
pub use types::{HealthResponse, InitStatusResponse};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while talking to a Vault endpoint
#[derive(Debug, Error)]
pub enum VaultError {
    /// The endpoint could not be reached or the request timed out
    #[error("failed to reach vault at {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered, but not with a usable status payload
    #[error("unexpected response from vault at {address}: {reason}")]
    Protocol { address: String, reason: String },
    /// No client can be bound to the address
    #[error("invalid vault address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    /// The shared HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl VaultError {
    /// Whether the next tick may succeed without any configuration change
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Protocol { .. })
    }
}

/// Status queries against one Vault address
#[async_trait]
pub trait VaultEndpoint: Send + Sync {
    /// The `host:port` this endpoint is bound to
    fn address(&self) -> &str;

    /// Whether the Vault cluster has been initialized
    async fn init_status(&self) -> Result<bool, VaultError>;

    /// Health report of the replica behind this address
    async fn health(&self) -> Result<HealthResponse, VaultError>;
}

/// Binds [`VaultEndpoint`]s to addresses
pub trait EndpointConnector: Send + Sync {
    /// Bind an endpoint to `address`
    ///
    /// # Errors
    /// Returns an error when no client can be created for the address
    fn connect(&self, address: &str) -> Result<Arc<dyn VaultEndpoint>, VaultError>;
}

/// Address of the cluster-wide Vault service of a VaultService resource
#[must_use]
pub fn service_address(name: &str, namespace: &str, port: u16) -> String {
    format!("{name}.{namespace}.svc:{port}")
}

/// Address of one Vault replica
#[must_use]
pub fn replica_address(pod_ip: &str, port: u16) -> String {
    if pod_ip.contains(':') {
        // IPv6 literal
        format!("[{pod_ip}]:{port}")
    } else {
        format!("{pod_ip}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_address() {
        assert_eq!(
            service_address("example", "vault-system", 8200),
            "example.vault-system.svc:8200"
        );
    }

    #[test]
    fn test_replica_address_ipv4_and_ipv6() {
        assert_eq!(replica_address("10.1.2.3", 8200), "10.1.2.3:8200");
        assert_eq!(replica_address("fd00::12", 8200), "[fd00::12]:8200");
    }

    #[test]
    fn test_only_network_failures_are_transient() {
        let protocol = VaultError::Protocol {
            address: "a:1".to_string(),
            reason: "bad".to_string(),
        };
        let invalid = VaultError::InvalidAddress {
            address: String::new(),
            reason: "empty".to_string(),
        };
        assert!(protocol.is_transient());
        assert!(!invalid.is_transient());
    }
}
