//! Vault status API payloads.
//!
//! API Reference: <https://developer.hashicorp.com/vault/api-docs/system/health>

use serde::{Deserialize, Serialize};

/// Response from `GET /v1/sys/init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitStatusResponse {
    pub initialized: bool,
}

/// Response from `GET /v1/sys/health`
///
/// Only `initialized`, `sealed` and `standby` drive classification. The
/// remaining fields are decoded when present so they can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub initialized: bool,
    pub sealed: bool,
    pub standby: bool,
    #[serde(default)]
    pub performance_standby: Option<bool>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub server_time_utc: Option<i64>,
}

impl HealthResponse {
    /// Minimal response carrying only the classification flags
    #[must_use]
    pub fn new(initialized: bool, sealed: bool, standby: bool) -> Self {
        Self {
            initialized,
            sealed,
            standby,
            performance_standby: None,
            version: None,
            cluster_name: None,
            cluster_id: None,
            server_time_utc: None,
        }
    }
}

/// Status code Vault should answer with for every replica state.
///
/// By default `/v1/sys/health` encodes the replica state in the HTTP status
/// (429 standby, 501 uninitialized, 503 sealed). Overriding all of them with
/// a 2xx code lets every state be read from the body.
pub const HEALTH_STATUS_OVERRIDE: &str = "299";

/// Query parameters sent with every health request
pub const HEALTH_QUERY: [(&str, &str); 5] = [
    ("uninitcode", HEALTH_STATUS_OVERRIDE),
    ("sealedcode", HEALTH_STATUS_OVERRIDE),
    ("standbycode", HEALTH_STATUS_OVERRIDE),
    ("drsecondarycode", HEALTH_STATUS_OVERRIDE),
    ("performancestandbycode", HEALTH_STATUS_OVERRIDE),
];
