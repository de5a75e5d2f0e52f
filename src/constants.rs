//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Interval between two status probe cycles of one VaultService (seconds)
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 10;

/// Port the Vault listener binds on every replica and on the service
pub const DEFAULT_VAULT_PORT: u16 = 8200;

/// URL scheme used to reach Vault replicas
pub const DEFAULT_VAULT_SCHEME: &str = "http";

/// Upper bound for a single Vault status request (seconds)
pub const DEFAULT_VAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Upper bound for establishing a connection to a Vault replica (seconds)
pub const DEFAULT_VAULT_CONNECT_TIMEOUT_SECS: u64 = 2;

/// Maximum number of replica health probes in flight per tick
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 8;

/// Requeue interval for successful VaultService reconciliations (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Fibonacci backoff lower bound for reconciliation errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Fibonacci backoff upper bound for reconciliation errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Finalizer that keeps a VaultService around until its monitor is stopped
pub const MONITOR_FINALIZER: &str = "vault.security.coreos.com/status-monitor";

/// Label key shared by every Vault pod
pub const VAULT_APP_LABEL_KEY: &str = "app";

/// Label value shared by every Vault pod
pub const VAULT_APP_LABEL_VALUE: &str = "vault";

/// Label key naming the VaultService a pod belongs to
pub const VAULT_CLUSTER_LABEL_KEY: &str = "vault_cluster";

/// Field manager / user agent reported to the API server and Vault
pub const CONTROLLER_NAME: &str = "vault-status-controller";
