//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_MAX_CONCURRENT_PROBES,
    DEFAULT_METRICS_PORT, DEFAULT_MONITOR_INTERVAL_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
    DEFAULT_VAULT_CONNECT_TIMEOUT_SECS, DEFAULT_VAULT_PORT, DEFAULT_VAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_VAULT_SCHEME,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Interval between two probe cycles of the same VaultService (seconds)
    pub monitor_interval_secs: u64,
    /// Port of the Vault listener on the service and on every replica
    pub vault_port: u16,
    /// URL scheme used for Vault requests (http or https)
    pub vault_scheme: String,
    /// Timeout for a whole Vault status request (seconds)
    pub vault_request_timeout_secs: u64,
    /// Timeout for connecting to a Vault endpoint (seconds)
    pub vault_connect_timeout_secs: u64,
    /// Maximum replica probes in flight during one tick
    pub max_concurrent_probes: usize,
    /// Requeue interval after a successful VaultService reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff lower bound for reconciliation errors (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff upper bound for reconciliation errors (seconds)
    pub backoff_max_secs: u64,
    /// Port for the metrics and probe HTTP server
    pub metrics_port: u16,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: DEFAULT_MONITOR_INTERVAL_SECS,
            vault_port: DEFAULT_VAULT_PORT,
            vault_scheme: DEFAULT_VAULT_SCHEME.to_string(),
            vault_request_timeout_secs: DEFAULT_VAULT_REQUEST_TIMEOUT_SECS,
            vault_connect_timeout_secs: DEFAULT_VAULT_CONNECT_TIMEOUT_SECS,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_format: "json".to_string(),
            enable_metrics: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Values that are missing or fail to parse fall back to their defaults.
    /// Zero durations and a zero probe concurrency are rejected the same way,
    /// since the monitor needs a finite but non-zero cadence.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let scheme = lookup("VAULT_SCHEME")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| s == "http" || s == "https")
            .unwrap_or(defaults.vault_scheme);
        let backoff_min_secs = parse_non_zero(&lookup, "BACKOFF_MIN_SECS", defaults.backoff_min_secs);
        let backoff_max_secs = parse_non_zero(&lookup, "BACKOFF_MAX_SECS", defaults.backoff_max_secs)
            .max(backoff_min_secs);

        Self {
            monitor_interval_secs: parse_non_zero(
                &lookup,
                "MONITOR_INTERVAL_SECS",
                defaults.monitor_interval_secs,
            ),
            vault_port: parse_or(&lookup, "VAULT_PORT", defaults.vault_port),
            vault_scheme: scheme,
            vault_request_timeout_secs: parse_non_zero(
                &lookup,
                "VAULT_REQUEST_TIMEOUT_SECS",
                defaults.vault_request_timeout_secs,
            ),
            vault_connect_timeout_secs: parse_non_zero(
                &lookup,
                "VAULT_CONNECT_TIMEOUT_SECS",
                defaults.vault_connect_timeout_secs,
            ),
            max_concurrent_probes: parse_or(
                &lookup,
                "MAX_CONCURRENT_PROBES",
                defaults.max_concurrent_probes,
            )
            .max(1),
            resync_interval_secs: parse_non_zero(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval_secs,
            ),
            backoff_min_secs,
            backoff_max_secs,
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            log_format: lookup("LOG_FORMAT")
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.log_format),
            enable_metrics: lookup("ENABLE_METRICS")
                .map_or(defaults.enable_metrics, |v| parse_bool(&v)),
        }
    }

    /// Get monitor tick interval
    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    /// Get Vault request timeout
    #[must_use]
    pub fn vault_request_timeout(&self) -> Duration {
        Duration::from_secs(self.vault_request_timeout_secs)
    }

    /// Get Vault connect timeout
    #[must_use]
    pub fn vault_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.vault_connect_timeout_secs)
    }

    /// Get resync interval for successful reconciliations
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Whether log lines should be emitted as JSON
    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.log_format != "text"
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_non_zero<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default) {
        0 => default,
        v => v,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
