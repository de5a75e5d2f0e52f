//! Common test utilities shared by the integration tests
//!
//! Provides rustls crypto provider setup and in-memory fakes for the seams
//! of the status monitor (Vault endpoints, replica discovery, status store).

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use vault_status_controller::controller::discovery::{DiscoveryError, ReplicaDiscovery};
use vault_status_controller::controller::monitor::StatusMonitor;
use vault_status_controller::config::ControllerConfig;
use vault_status_controller::controller::prober::ReplicaHealthProber;
use vault_status_controller::controller::reconciler::Reconciler;
use vault_status_controller::controller::store::{EntityRef, StatusStore, StoreError};
use vault_status_controller::crd::{VaultService, VaultServiceSpec, VaultServiceStatus};
use vault_status_controller::vault::{EndpointConnector, HealthResponse, VaultEndpoint, VaultError};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` so it is only installed once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Another provider may already be installed for this process
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub const SERVICE_ADDRESS: &str = "example.default.svc:8200";

pub fn entity() -> EntityRef {
    EntityRef::new("example", "default")
}

pub fn vault_service(status: Option<VaultServiceStatus>) -> VaultService {
    let mut vault = VaultService::new(
        "example",
        VaultServiceSpec {
            nodes: 3,
            version: Some("0.9.1-0".to_string()),
            base_image: None,
            suspend_monitoring: false,
        },
    );
    vault.metadata.namespace = Some("default".to_string());
    vault.metadata.resource_version = Some("1".to_string());
    vault.status = status;
    vault
}

pub fn health(initialized: bool, sealed: bool, standby: bool) -> Option<HealthResponse> {
    Some(HealthResponse::new(initialized, sealed, standby))
}

/// Scripted view of a Vault cluster
///
/// `init` answers the service address. `replicas` maps a replica address to
/// its health report; `None` (or a missing entry) makes the probe fail.
#[derive(Default)]
pub struct FakeCluster {
    pub init: Mutex<Option<bool>>,
    pub replicas: Mutex<HashMap<String, Option<HealthResponse>>>,
    pub init_calls: Mutex<u32>,
}

impl FakeCluster {
    pub fn new(init: Option<bool>, replicas: &[(&str, Option<HealthResponse>)]) -> Arc<Self> {
        Arc::new(Self {
            init: Mutex::new(init),
            replicas: Mutex::new(
                replicas
                    .iter()
                    .map(|(address, health)| ((*address).to_string(), health.clone()))
                    .collect(),
            ),
            init_calls: Mutex::new(0),
        })
    }

    pub fn set_init(&self, init: Option<bool>) {
        *self.init.lock().unwrap() = init;
    }

    pub fn set_replica(&self, address: &str, health: Option<HealthResponse>) {
        self.replicas
            .lock()
            .unwrap()
            .insert(address.to_string(), health);
    }

    pub fn init_calls(&self) -> u32 {
        *self.init_calls.lock().unwrap()
    }
}

pub struct FakeEndpoint {
    address: String,
    cluster: Arc<FakeCluster>,
}

#[async_trait]
impl VaultEndpoint for FakeEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    async fn init_status(&self) -> Result<bool, VaultError> {
        *self.cluster.init_calls.lock().unwrap() += 1;
        let init = *self.cluster.init.lock().unwrap();
        init.ok_or_else(|| VaultError::Protocol {
            address: self.address.clone(),
            reason: "connection refused".to_string(),
        })
    }

    async fn health(&self) -> Result<HealthResponse, VaultError> {
        let health = self
            .cluster
            .replicas
            .lock()
            .unwrap()
            .get(&self.address)
            .cloned()
            .flatten();
        health.ok_or_else(|| VaultError::Protocol {
            address: self.address.clone(),
            reason: "connection refused".to_string(),
        })
    }
}

pub struct FakeConnector {
    pub cluster: Arc<FakeCluster>,
}

impl EndpointConnector for FakeConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn VaultEndpoint>, VaultError> {
        Ok(Arc::new(FakeEndpoint {
            address: address.to_string(),
            cluster: self.cluster.clone(),
        }))
    }
}

/// Discovery returning a fixed, replaceable list of addresses
pub struct FakeDiscovery {
    pub addresses: Mutex<Option<Vec<String>>>,
}

impl FakeDiscovery {
    pub fn new(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            addresses: Mutex::new(Some(addresses.iter().map(|a| (*a).to_string()).collect())),
        })
    }

    /// Make discovery fail until addresses are set again
    pub fn fail(&self) {
        *self.addresses.lock().unwrap() = None;
    }
}

#[async_trait]
impl ReplicaDiscovery for FakeDiscovery {
    async fn replica_addresses(&self, entity: &EntityRef) -> Result<Vec<String>, DiscoveryError> {
        self.addresses
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DiscoveryError::List {
                entity: entity.clone(),
                source: kube::Error::Api(kube::error::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "pods is forbidden".to_string(),
                    reason: "Forbidden".to_string(),
                    code: 403,
                }),
            })
    }
}

/// Failure injected into the next `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFailure {
    Conflict,
    NotFound,
}

/// In-memory status store with resourceVersion based optimistic concurrency
pub struct FakeStore {
    pub record: Mutex<Option<VaultService>>,
    pub scripted_failures: Mutex<VecDeque<UpdateFailure>>,
    pub updates: Mutex<Vec<VaultServiceStatus>>,
}

impl FakeStore {
    pub fn new(record: Option<VaultService>) -> Arc<Self> {
        Arc::new(Self {
            record: Mutex::new(record),
            scripted_failures: Mutex::new(VecDeque::new()),
            updates: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next_update(&self, failure: UpdateFailure) {
        self.scripted_failures.lock().unwrap().push_back(failure);
    }

    /// Write performed by another actor, bumping the resourceVersion
    pub fn external_write(&self, status: VaultServiceStatus) {
        let mut record = self.record.lock().unwrap();
        if let Some(record) = record.as_mut() {
            record.status = Some(status);
            bump_resource_version(record);
        }
    }

    pub fn current_status(&self) -> Option<VaultServiceStatus> {
        self.record
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|r| r.status.clone())
    }

    pub fn committed(&self) -> Vec<VaultServiceStatus> {
        self.updates.lock().unwrap().clone()
    }
}

fn bump_resource_version(record: &mut VaultService) {
    let next = record
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    record.metadata.resource_version = Some(next.to_string());
}

#[async_trait]
impl StatusStore for FakeStore {
    async fn get(&self, entity: &EntityRef) -> Result<VaultService, StoreError> {
        self.record
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StoreError::NotFound(entity.clone()))
    }

    async fn update(&self, submitted: &VaultService) -> Result<VaultService, StoreError> {
        let entity = entity();
        if let Some(failure) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(match failure {
                UpdateFailure::Conflict => StoreError::Conflict(entity),
                UpdateFailure::NotFound => StoreError::NotFound(entity),
            });
        }

        let mut current = self.record.lock().unwrap();
        let Some(current) = current.as_mut() else {
            return Err(StoreError::NotFound(entity));
        };
        if current.metadata.resource_version != submitted.metadata.resource_version {
            return Err(StoreError::Conflict(entity));
        }

        current.status = submitted.status.clone();
        bump_resource_version(current);
        if let Some(status) = &submitted.status {
            self.updates.lock().unwrap().push(status.clone());
        }
        Ok(current.clone())
    }
}

/// Monitor wired to the fakes with the given interval
pub fn monitor(
    cluster: &Arc<FakeCluster>,
    discovery: &Arc<FakeDiscovery>,
    store: &Arc<FakeStore>,
    interval: Duration,
) -> StatusMonitor {
    let connector = Arc::new(FakeConnector {
        cluster: cluster.clone(),
    });
    StatusMonitor::new(
        entity(),
        connector.connect(SERVICE_ADDRESS).unwrap(),
        discovery.clone(),
        ReplicaHealthProber::new(connector, 4),
        store.clone(),
        interval,
    )
}

/// Kubernetes client that is never connected
///
/// Building it opens no connection; it only satisfies APIs that carry a
/// client without using it.
pub fn offline_client() -> kube::Client {
    init_rustls();
    let config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
    kube::Client::try_from(config).unwrap()
}

/// Reconciler context wired to the fakes
///
/// Monitors tick once an hour, so nothing runs during a test unless a tick
/// is triggered explicitly.
pub fn reconciler(
    cluster: &Arc<FakeCluster>,
    discovery: &Arc<FakeDiscovery>,
    store: &Arc<FakeStore>,
) -> Reconciler {
    let config = ControllerConfig {
        monitor_interval_secs: 3600,
        ..ControllerConfig::default()
    };
    Reconciler::with_collaborators(
        offline_client(),
        config,
        Arc::new(FakeConnector {
            cluster: cluster.clone(),
        }),
        discovery.clone(),
        store.clone(),
    )
}
