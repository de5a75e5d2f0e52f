//! # Replica Health Prober
//!
//! Asks every Vault replica for its own health report and classifies it.
//!
//! Replicas are not fungible: the cluster-wide service address only tells
//! whether the cluster is initialized, never which replica is active. Each
//! replica is therefore bound and queried individually. A replica that cannot
//! be reached (or answers with garbage) is classified `Unreachable`; the other
//! probes continue. There are no retries here, the next tick is the retry.

use crate::observability::metrics;
use crate::vault::{EndpointConnector, HealthResponse};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Role of a replica as observed during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaClassification {
    /// Initialized, unsealed and not standby
    Active,
    /// Reported sealed, regardless of every other flag
    Sealed,
    /// Unsealed but standby (or not yet initialized)
    StandbyUnsealed,
    /// No usable health report this tick
    Unreachable,
}

impl ReplicaClassification {
    /// Label used in logs and metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaClassification::Active => "active",
            ReplicaClassification::Sealed => "sealed",
            ReplicaClassification::StandbyUnsealed => "standby_unsealed",
            ReplicaClassification::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for ReplicaClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one replica address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaProbe {
    pub address: String,
    pub classification: ReplicaClassification,
}

impl ReplicaProbe {
    #[must_use]
    pub fn new(address: impl Into<String>, classification: ReplicaClassification) -> Self {
        Self {
            address: address.into(),
            classification,
        }
    }
}

/// Classify a health report
///
/// `sealed` takes precedence over standby/active reporting.
#[must_use]
pub fn classify(health: &HealthResponse) -> ReplicaClassification {
    if health.sealed {
        ReplicaClassification::Sealed
    } else if health.initialized && !health.standby {
        ReplicaClassification::Active
    } else {
        ReplicaClassification::StandbyUnsealed
    }
}

/// Probes a set of replica addresses
#[derive(Clone)]
pub struct ReplicaHealthProber {
    connector: Arc<dyn EndpointConnector>,
    max_concurrent_probes: usize,
}

impl std::fmt::Debug for ReplicaHealthProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaHealthProber")
            .field("max_concurrent_probes", &self.max_concurrent_probes)
            .finish_non_exhaustive()
    }
}

impl ReplicaHealthProber {
    #[must_use]
    pub fn new(connector: Arc<dyn EndpointConnector>, max_concurrent_probes: usize) -> Self {
        Self {
            connector,
            max_concurrent_probes: max_concurrent_probes.max(1),
        }
    }

    /// Probe every address and return one result per address
    ///
    /// Probes run concurrently (bounded), but the result vector is always in
    /// the order of `addresses`, never in completion order.
    pub async fn probe(&self, addresses: &[String]) -> Vec<ReplicaProbe> {
        stream::iter(addresses.iter().cloned())
            .map(|address| self.probe_one(address))
            .buffered(self.max_concurrent_probes)
            .collect()
            .await
    }

    async fn probe_one(&self, address: String) -> ReplicaProbe {
        let classification = match self.connector.connect(&address) {
            Ok(endpoint) => match endpoint.health().await {
                Ok(health) => {
                    let classification = classify(&health);
                    debug!(
                        replica.address = address.as_str(),
                        replica.classification = classification.as_str(),
                        initialized = health.initialized,
                        sealed = health.sealed,
                        standby = health.standby,
                        "replica probed"
                    );
                    classification
                }
                Err(e) => {
                    warn!(
                        replica.address = address.as_str(),
                        "failed requesting health info for vault replica: {}", e
                    );
                    ReplicaClassification::Unreachable
                }
            },
            Err(e) => {
                warn!(
                    replica.address = address.as_str(),
                    "failed creating client for vault replica: {}", e
                );
                ReplicaClassification::Unreachable
            }
        };

        metrics::record_replica_probe(classification.as_str());
        ReplicaProbe {
            address,
            classification,
        }
    }
}
