//! # Reconciler
//!
//! Owning controller logic for VaultService resources.
//!
//! Reconciliation does not compute status itself. It makes sure exactly one
//! [`StatusMonitor`] runs for each live VaultService, stops it when
//! monitoring is suspended, and stops it before the finalizer is released on
//! deletion. The monitor is the only writer of `.status`.

use super::backoff::BackoffState;
use super::discovery::{PodReplicaDiscovery, ReplicaDiscovery};
use super::monitor::StatusMonitor;
use super::registry::MonitorRegistry;
use super::store::{EntityRef, KubeStatusStore, StatusStore};
use crate::config::ControllerConfig;
use crate::constants::MONITOR_FINALIZER;
use crate::crd::VaultService;
use crate::observability;
use crate::vault::{EndpointConnector, HttpEndpointConnector, VaultError};
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event as FinalizerEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("VaultService {0} has no namespace")]
    MissingNamespace(String),
    #[error("failed to start the status monitor: {0}")]
    MonitorStart(#[from] VaultError),
    #[error("finalizer error: {0}")]
    Finalizer(#[source] Box<kube_runtime::finalizer::Error<ReconcilerError>>),
}

/// Shared context handed to every reconciliation
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub config: ControllerConfig,
    pub registry: Arc<MonitorRegistry>,
    pub connector: Arc<dyn EndpointConnector>,
    pub discovery: Arc<dyn ReplicaDiscovery>,
    pub store: Arc<dyn StatusStore>,
    // Keyed by namespace/name, owned by the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    /// Generation of each resource at its last successful apply
    pub applied_generations: Arc<Mutex<HashMap<EntityRef, i64>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Build the context with the Kubernetes and Vault HTTP backed collaborators
    ///
    /// # Errors
    /// Fails if the shared Vault HTTP client cannot be built.
    pub fn new(client: Client, config: ControllerConfig) -> Result<Self, VaultError> {
        let connector: Arc<dyn EndpointConnector> = Arc::new(HttpEndpointConnector::new(&config)?);
        let discovery: Arc<dyn ReplicaDiscovery> =
            Arc::new(PodReplicaDiscovery::new(client.clone(), config.vault_port));
        let store: Arc<dyn StatusStore> = Arc::new(KubeStatusStore::new(client.clone()));

        Ok(Self::with_collaborators(client, config, connector, discovery, store))
    }

    /// Build the context around explicit Vault, discovery and store seams
    #[must_use]
    pub fn with_collaborators(
        client: Client,
        config: ControllerConfig,
        connector: Arc<dyn EndpointConnector>,
        discovery: Arc<dyn ReplicaDiscovery>,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            client,
            config,
            registry: Arc::new(MonitorRegistry::new()),
            connector,
            discovery,
            store,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            applied_generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether the event carries nothing new for this controller
    ///
    /// True when the spec generation was already applied, the finalizer is in
    /// place, the resource is not being deleted, and the monitor is in the
    /// state the spec asks for. Every status commit of a monitor produces such
    /// an event.
    #[must_use]
    pub fn is_status_only_change(&self, vault: &VaultService) -> bool {
        if vault.metadata.deletion_timestamp.is_some()
            || !vault.finalizers().iter().any(|f| f == MONITOR_FINALIZER)
        {
            return false;
        }
        let (Some(entity), Some(generation)) =
            (EntityRef::from_resource(vault), vault.metadata.generation)
        else {
            return false;
        };

        let applied = self
            .applied_generations
            .lock()
            .ok()
            .and_then(|generations| generations.get(&entity).copied());
        if applied != Some(generation) {
            return false;
        }

        self.registry.is_running(&entity) != vault.spec.suspend_monitoring
    }

    /// Make the monitor match the desired state of `vault`
    ///
    /// # Errors
    /// Fails if the resource is not namespaced or no monitor can be built.
    pub async fn apply(&self, vault: &VaultService) -> Result<Action, ReconcilerError> {
        let entity = EntityRef::from_resource(vault)
            .ok_or_else(|| ReconcilerError::MissingNamespace(vault.name_any()))?;

        if vault.spec.suspend_monitoring {
            if self.registry.stop(&entity).await.is_some() {
                info!("monitoring suspended for {}", entity);
            }
        } else {
            let started = self.registry.ensure(&entity, || {
                StatusMonitor::for_entity(
                    entity.clone(),
                    &self.config,
                    self.connector.clone(),
                    self.discovery.clone(),
                    self.store.clone(),
                )
            })?;
            if !started {
                debug!("monitor for {} already running", entity);
            }
        }

        self.reset_backoff(&entity);
        if let (Some(generation), Ok(mut generations)) =
            (vault.metadata.generation, self.applied_generations.lock())
        {
            generations.insert(entity, generation);
        }
        Ok(Action::requeue(self.config.resync_interval()))
    }

    /// Stop the monitor of a VaultService that is being deleted
    ///
    /// # Errors
    /// Fails only if the resource is not namespaced.
    pub async fn cleanup(&self, vault: &VaultService) -> Result<Action, ReconcilerError> {
        let entity = EntityRef::from_resource(vault)
            .ok_or_else(|| ReconcilerError::MissingNamespace(vault.name_any()))?;

        if let Some(outcome) = self.registry.stop(&entity).await {
            info!(
                resource.name = entity.name.as_str(),
                resource.namespace = entity.namespace.as_str(),
                ticks = outcome.ticks,
                "vault service deleted, monitor stopped"
            );
        }
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(&entity.to_string());
        }
        if let Ok(mut generations) = self.applied_generations.lock() {
            generations.remove(&entity);
        }
        Ok(Action::await_change())
    }

    fn reset_backoff(&self, entity: &EntityRef) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(&entity.to_string()) {
                if state.error_count > 0 {
                    info!("backoff reset for {} after successful reconciliation", entity);
                }
                state.reset();
            }
        }
    }
}

/// Reconcile one VaultService
///
/// # Errors
/// Returns a [`ReconcilerError`], handled by the error policy.
pub async fn reconcile(
    vault: Arc<VaultService>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = vault.name_any();
    let namespace = vault
        .namespace()
        .ok_or_else(|| ReconcilerError::MissingNamespace(name.clone()))?;

    let span = info_span!(
        "controller.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.kind = "VaultService"
    );

    if ctx.is_status_only_change(&vault) {
        debug!(parent: &span, "skipping reconciliation, only status changed");
        return Ok(Action::requeue(ctx.config.resync_interval()));
    }

    async move {
        observability::metrics::increment_reconciliations();
        let api: Api<VaultService> = Api::namespaced(ctx.client.clone(), &namespace);

        finalizer(&api, MONITOR_FINALIZER, vault, |event| async {
            match event {
                FinalizerEvent::Apply(vault) => ctx.apply(&vault).await,
                FinalizerEvent::Cleanup(vault) => ctx.cleanup(&vault).await,
            }
        })
        .await
        .map_err(|e| ReconcilerError::Finalizer(Box::new(e)))
    }
    .instrument(span)
    .await
}
