//! # VaultService Status
//!
//! The aggregate cluster view written by the status monitor.

use serde::{Deserialize, Serialize};

/// Status of the VaultService resource
///
/// Reflects the most recently completed probe cycle. Every field is rewritten
/// as a whole on each commit, never merged field by field.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultServiceStatus {
    /// Whether the Vault cluster has completed its one-time initialization
    #[serde(default)]
    pub initialized: bool,
    /// Address (host:port) of the unsealed, non-standby replica
    /// Empty when no active replica answered during the last cycle
    #[serde(default)]
    pub active_node: String,
    /// Addresses (host:port) of all replicas that reported sealed,
    /// in replica enumeration order
    #[serde(default)]
    pub sealed_nodes: Vec<String>,
}

impl VaultServiceStatus {
    /// Whether an active replica is currently known
    #[must_use]
    pub fn has_active_node(&self) -> bool {
        !self.active_node.is_empty()
    }
}
