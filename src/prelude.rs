//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use vault_status_controller::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Vault status API
pub use crate::vault::{
    EndpointConnector, HealthResponse, HttpEndpointConnector, VaultEndpoint, VaultError,
    VaultHttpClient,
};

// Monitor building blocks
pub use crate::controller::discovery::{DiscoveryError, PodReplicaDiscovery, ReplicaDiscovery};
pub use crate::controller::monitor::{MonitorOutcome, MonitorState, StatusMonitor, TickOutcome};
pub use crate::controller::prober::{ReplicaClassification, ReplicaHealthProber, ReplicaProbe};
pub use crate::controller::registry::MonitorRegistry;
pub use crate::controller::store::{EntityRef, KubeStatusStore, StatusStore, StoreError};

// Reconciler types
pub use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};

// Config types
pub use crate::config::ControllerConfig;
