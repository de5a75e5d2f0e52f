//! # Replica Discovery
//!
//! Enumerates the current Vault replicas of a VaultService.
//!
//! Membership is fully dynamic: pods are listed again on every tick using
//! the labels the Vault deployment stamps on its pods.

use super::store::EntityRef;
use crate::constants::{VAULT_APP_LABEL_KEY, VAULT_APP_LABEL_VALUE, VAULT_CLUSTER_LABEL_KEY};
use crate::vault::replica_address;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use thiserror::Error;

/// Errors raised while enumerating replicas
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed listing pods for the vault service {entity}: {source}")]
    List {
        entity: EntityRef,
        #[source]
        source: kube::Error,
    },
}

/// Source of the replica address set of a VaultService
#[async_trait]
pub trait ReplicaDiscovery: Send + Sync {
    /// Current replica addresses (`host:port`) in a stable enumeration order
    async fn replica_addresses(&self, entity: &EntityRef) -> Result<Vec<String>, DiscoveryError>;
}

/// Label selector matching every pod of one Vault cluster
#[must_use]
pub fn vault_pod_selector(name: &str) -> String {
    format!("{VAULT_APP_LABEL_KEY}={VAULT_APP_LABEL_VALUE},{VAULT_CLUSTER_LABEL_KEY}={name}")
}

/// Turn listed pods into replica addresses
///
/// Pods without an IP or already terminating are skipped. The result is
/// sorted by pod name and free of duplicate addresses (first one wins).
#[must_use]
pub fn addresses_from_pods(mut pods: Vec<Pod>, port: u16) -> Vec<String> {
    pods.sort_by_key(ResourceExt::name_any);

    let mut addresses: Vec<String> = Vec::with_capacity(pods.len());
    for pod in &pods {
        if pod.metadata.deletion_timestamp.is_some() {
            continue;
        }
        let Some(ip) = pod
            .status
            .as_ref()
            .and_then(|s| s.pod_ip.as_deref())
            .filter(|ip| !ip.is_empty())
        else {
            continue;
        };
        let address = replica_address(ip, port);
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    }
    addresses
}

/// Discovers replicas by listing labelled pods
#[derive(Clone)]
pub struct PodReplicaDiscovery {
    client: Client,
    port: u16,
}

impl std::fmt::Debug for PodReplicaDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodReplicaDiscovery")
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl PodReplicaDiscovery {
    #[must_use]
    pub fn new(client: Client, port: u16) -> Self {
        Self { client, port }
    }
}

#[async_trait]
impl ReplicaDiscovery for PodReplicaDiscovery {
    async fn replica_addresses(&self, entity: &EntityRef) -> Result<Vec<String>, DiscoveryError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &entity.namespace);
        let params = ListParams::default().labels(&vault_pod_selector(&entity.name));
        let list = pods
            .list(&params)
            .await
            .map_err(|source| DiscoveryError::List {
                entity: entity.clone(),
                source,
            })?;
        Ok(addresses_from_pods(list.items, self.port))
    }
}
