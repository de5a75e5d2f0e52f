//! # VaultService Spec
//!
//! The custom resource the controller watches. One monitor runs per resource.

use super::status::VaultServiceStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VaultService Custom Resource Definition
///
/// Describes a clustered Vault deployment. The controller never mutates the
/// Vault cluster itself; it only observes the replicas and publishes the
/// aggregate state in `.status`.
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.security.coreos.com/v1alpha1
/// kind: VaultService
/// metadata:
///   name: example
///   namespace: default
/// spec:
///   nodes: 3
///   version: 0.9.1-0
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "VaultService",
    group = "vault.security.coreos.com",
    version = "v1alpha1",
    namespaced,
    status = "VaultServiceStatus",
    shortname = "vault",
    printcolumn = r#"{"name":"Initialized", "type":"boolean", "jsonPath":".status.initialized"}"#,
    printcolumn = r#"{"name":"Active", "type":"string", "jsonPath":".status.activeNode"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VaultServiceSpec {
    /// Desired number of Vault replicas
    #[serde(default = "default_nodes")]
    pub nodes: i32,
    /// Vault version to run
    #[serde(default)]
    pub version: Option<String>,
    /// Base image for the Vault containers
    #[serde(default)]
    pub base_image: Option<String>,
    /// Stop publishing status for this resource without deleting it
    #[serde(default = "default_false")]
    pub suspend_monitoring: bool,
}

#[must_use]
pub fn default_nodes() -> i32 {
    1
}

#[must_use]
pub fn default_false() -> bool {
    false
}
