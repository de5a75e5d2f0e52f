//! # Status Aggregation
//!
//! Folds per-replica classifications into the aggregate cluster status.
//!
//! The fold walks the probes in enumeration order:
//! - every `Sealed` address is appended to `sealed_nodes`
//! - the last `Active` address becomes `active_node`
//! - `StandbyUnsealed` and `Unreachable` addresses contribute nothing
//!
//! More than one `Active` replica (for example a transient split during
//! failover) is resolved by "last seen wins". This is a tie-break, not a
//! leadership guarantee: readers must not infer leader uniqueness from
//! `active_node` alone.

use super::prober::{ReplicaClassification, ReplicaProbe};
use crate::crd::VaultServiceStatus;
use tracing::warn;

/// Build the cluster status from the init flag and the ordered probe results
#[must_use]
pub fn aggregate(initialized: bool, probes: &[ReplicaProbe]) -> VaultServiceStatus {
    let mut active_node = String::new();
    let mut sealed_nodes = Vec::new();
    let mut active_count = 0usize;

    for probe in probes {
        match probe.classification {
            ReplicaClassification::Active => {
                active_count += 1;
                active_node.clone_from(&probe.address);
            }
            ReplicaClassification::Sealed => {
                if !sealed_nodes.contains(&probe.address) {
                    sealed_nodes.push(probe.address.clone());
                }
            }
            ReplicaClassification::StandbyUnsealed | ReplicaClassification::Unreachable => {}
        }
    }

    if active_count > 1 {
        let active: Vec<&str> = probes
            .iter()
            .filter(|p| p.classification == ReplicaClassification::Active)
            .map(|p| p.address.as_str())
            .collect();
        warn!(
            active_nodes = ?active,
            chosen = active_node.as_str(),
            "multiple vault replicas report active; using the last one observed"
        );
    }

    VaultServiceStatus {
        initialized,
        active_node,
        sealed_nodes,
    }
}
