//! # Status Monitor
//!
//! Long-lived per-VaultService loop that keeps `.status` up to date.
//!
//! Each tick runs strictly in sequence:
//! 1. wait for the interval, or stop immediately if cancelled
//! 2. ask the cluster service address whether Vault is initialized
//! 3. discover the replicas, probe them and aggregate the results
//! 4. commit the aggregate through the status store
//!
//! Every failure is logged and the loop moves on to the next tick; nothing in
//! here is fatal. Cancellation is only observed at the interval wait, so a
//! network call that is already in flight runs to completion (or its timeout).

use super::aggregate::aggregate;
use super::discovery::{DiscoveryError, ReplicaDiscovery};
use super::prober::ReplicaHealthProber;
use super::store::{commit_status, EntityRef, StatusStore, StoreError};
use crate::config::ControllerConfig;
use crate::crd::VaultServiceStatus;
use crate::observability::metrics;
use crate::vault::{service_address, EndpointConnector, VaultEndpoint, VaultError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lifecycle of a monitor; `Running -> Stopped` is the only transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Stopped,
}

/// Result of a single tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Status was written
    Committed,
    /// Cluster init status could not be read; nothing was written
    InitCheckFailed(VaultError),
    /// Replicas could not be listed; nothing was written
    DiscoveryFailed(DiscoveryError),
    /// Status was computed but the store rejected or failed the write
    CommitFailed(StoreError),
}

impl TickOutcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Stage label used for the tick error counter
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Committed => "none",
            Self::InitCheckFailed(_) => "init_check",
            Self::DiscoveryFailed(_) => "discovery",
            Self::CommitFailed(e) if e.is_conflict() => "conflict",
            Self::CommitFailed(_) => "commit",
        }
    }
}

/// Summary returned once a monitor has stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub entity: EntityRef,
    pub ticks: u64,
    pub last_committed: Option<VaultServiceStatus>,
}

/// Reconcile loop for one VaultService
pub struct StatusMonitor {
    entity: EntityRef,
    service: Arc<dyn VaultEndpoint>,
    discovery: Arc<dyn ReplicaDiscovery>,
    prober: ReplicaHealthProber,
    store: Arc<dyn StatusStore>,
    interval: Duration,
    state: MonitorState,
    ticks: u64,
    last_committed: Option<VaultServiceStatus>,
}

impl std::fmt::Debug for StatusMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMonitor")
            .field("entity", &self.entity)
            .field("service", &self.service.address())
            .field("interval", &self.interval)
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl StatusMonitor {
    #[must_use]
    pub fn new(
        entity: EntityRef,
        service: Arc<dyn VaultEndpoint>,
        discovery: Arc<dyn ReplicaDiscovery>,
        prober: ReplicaHealthProber,
        store: Arc<dyn StatusStore>,
        interval: Duration,
    ) -> Self {
        Self {
            entity,
            service,
            discovery,
            prober,
            store,
            interval,
            state: MonitorState::Running,
            ticks: 0,
            last_committed: None,
        }
    }

    /// Build a monitor whose service client is bound to the cluster DNS name
    ///
    /// # Errors
    /// Returns an error if no client can be built for the service address.
    pub fn for_entity(
        entity: EntityRef,
        config: &ControllerConfig,
        connector: Arc<dyn EndpointConnector>,
        discovery: Arc<dyn ReplicaDiscovery>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self, VaultError> {
        let address = service_address(&entity.name, &entity.namespace, config.vault_port);
        let service = connector.connect(&address)?;
        let prober = ReplicaHealthProber::new(connector, config.max_concurrent_probes);
        Ok(Self::new(
            entity,
            service,
            discovery,
            prober,
            store,
            config.monitor_interval(),
        ))
    }

    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Status of the last successful commit, if any
    #[must_use]
    pub fn last_committed(&self) -> Option<&VaultServiceStatus> {
        self.last_committed.as_ref()
    }

    /// Run until `token` is cancelled
    pub async fn run(mut self, token: CancellationToken) -> MonitorOutcome {
        info!(
            resource.name = self.entity.name.as_str(),
            resource.namespace = self.entity.namespace.as_str(),
            service.address = self.service.address(),
            interval_secs = self.interval.as_secs(),
            "started monitoring vault"
        );

        while self.state == MonitorState::Running {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    self.state = MonitorState::Stopped;
                }
                () = tokio::time::sleep(self.interval) => {
                    let outcome = self.tick().await;
                    debug!(
                        resource.name = self.entity.name.as_str(),
                        resource.namespace = self.entity.namespace.as_str(),
                        committed = outcome.is_committed(),
                        "monitor tick finished"
                    );
                }
            }
        }

        info!(
            resource.name = self.entity.name.as_str(),
            resource.namespace = self.entity.namespace.as_str(),
            ticks = self.ticks,
            "stopped monitoring vault"
        );

        // Bound clients are dropped with `self`
        MonitorOutcome {
            entity: self.entity,
            ticks: self.ticks,
            last_committed: self.last_committed,
        }
    }

    /// Run a single tick now
    pub async fn tick(&mut self) -> TickOutcome {
        let start = Instant::now();
        self.ticks += 1;
        metrics::increment_monitor_ticks();

        let span = info_span!(
            "monitor.tick",
            resource.name = self.entity.name.as_str(),
            resource.namespace = self.entity.namespace.as_str(),
            tick = self.ticks
        );
        let outcome = self.run_tick().instrument(span).await;

        if !outcome.is_committed() {
            metrics::increment_monitor_tick_errors(outcome.stage());
        }
        metrics::observe_monitor_tick_duration(start.elapsed().as_secs_f64());
        outcome
    }

    async fn run_tick(&mut self) -> TickOutcome {
        let initialized = match self.service.init_status().await {
            Ok(initialized) => initialized,
            Err(e) => {
                if e.is_transient() {
                    warn!(
                        service.address = self.service.address(),
                        "failed getting the init status for the vault service {}: {}", self.entity, e
                    );
                } else {
                    error!(
                        service.address = self.service.address(),
                        "failed getting the init status for the vault service {}: {}", self.entity, e
                    );
                }
                return TickOutcome::InitCheckFailed(e);
            }
        };

        let addresses = match self.discovery.replica_addresses(&self.entity).await {
            Ok(addresses) => addresses,
            Err(e) => {
                error!("failed to update vault replica status: {}", e);
                return TickOutcome::DiscoveryFailed(e);
            }
        };

        let probes = self.prober.probe(&addresses).await;
        let status = aggregate(initialized, &probes);

        match commit_status(self.store.as_ref(), &self.entity, status.clone()).await {
            Ok(_) => {
                metrics::increment_status_updates();
                debug!(
                    initialized = status.initialized,
                    active_node = status.active_node.as_str(),
                    sealed_nodes = ?status.sealed_nodes,
                    "vault status committed"
                );
                self.last_committed = Some(status);
                TickOutcome::Committed
            }
            Err(e) => {
                if e.is_conflict() {
                    metrics::increment_status_update_conflicts();
                    warn!("status update for {} conflicted, retrying next tick", self.entity);
                } else {
                    error!("failed updating the status for the vault service {}: {}", self.entity, e);
                }
                TickOutcome::CommitFailed(e)
            }
        }
    }
}
