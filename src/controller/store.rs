//! # Status Record Store
//!
//! Read-modify-write access to the `.status` of a VaultService.
//!
//! Every commit reads the latest record, overwrites only its status and
//! submits it back carrying the `resourceVersion` that was read. If anything
//! else wrote the record in between, the API server answers 409 and the write
//! is dropped; the next tick re-derives fresh status and tries again. There is
//! no locking and the controller never assumes it is the only writer.

use crate::crd::{VaultService, VaultServiceStatus};
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use thiserror::Error;

/// Identifies the VaultService a monitor works for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub name: String,
    pub namespace: String,
}

impl EntityRef {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Reference to an existing resource, `None` if it has no namespace
    #[must_use]
    pub fn from_resource(vault: &VaultService) -> Option<Self> {
        let namespace = vault.namespace()?;
        Some(Self::new(vault.name_any(), namespace))
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Errors raised by the status store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed between read and write
    #[error("status of {0} was modified concurrently")]
    Conflict(EntityRef),
    /// The record no longer exists
    #[error("{0} not found")]
    NotFound(EntityRef),
    /// Any other API failure
    #[error("failed to access status of {entity}: {source}")]
    Transport {
        entity: EntityRef,
        #[source]
        source: kube::Error,
    },
    /// The record could not be encoded for submission
    #[error("failed to encode {entity}: {source}")]
    Serialization {
        entity: EntityRef,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Map a kube API error onto the store taxonomy
    #[must_use]
    pub fn from_kube(entity: &EntityRef, error: kube::Error) -> Self {
        if let kube::Error::Api(response) = &error {
            match response.code {
                409 => return Self::Conflict(entity.clone()),
                404 => return Self::NotFound(entity.clone()),
                _ => {}
            }
        }
        Self::Transport {
            entity: entity.clone(),
            source: error,
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Persistent home of the VaultService record
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Read the current record
    async fn get(&self, entity: &EntityRef) -> Result<VaultService, StoreError>;

    /// Submit a record read by [`StatusStore::get`]; fails with
    /// [`StoreError::Conflict`] if it changed since that read
    async fn update(&self, record: &VaultService) -> Result<VaultService, StoreError>;
}

/// Status store backed by the Kubernetes API status subresource
#[derive(Clone)]
pub struct KubeStatusStore {
    client: Client,
}

impl std::fmt::Debug for KubeStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStatusStore").finish_non_exhaustive()
    }
}

impl KubeStatusStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<VaultService> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl StatusStore for KubeStatusStore {
    async fn get(&self, entity: &EntityRef) -> Result<VaultService, StoreError> {
        self.api(&entity.namespace)
            .get_status(&entity.name)
            .await
            .map_err(|e| StoreError::from_kube(entity, e))
    }

    async fn update(&self, record: &VaultService) -> Result<VaultService, StoreError> {
        let entity = EntityRef::new(
            record.name_any(),
            record.namespace().unwrap_or_default(),
        );
        // resourceVersion from the read is kept in the body, so the API server
        // rejects the replace with 409 if the object moved on since
        let body = serde_json::to_vec(record).map_err(|source| StoreError::Serialization {
            entity: entity.clone(),
            source,
        })?;

        self.api(&entity.namespace)
            .replace_status(&entity.name, &PostParams::default(), body)
            .await
            .map_err(|e| StoreError::from_kube(&entity, e))
    }
}

/// Get the latest record, overwrite only its status, and submit it
///
/// # Errors
/// Propagates the store error of the failing step. No retry is attempted.
pub async fn commit_status(
    store: &dyn StatusStore,
    entity: &EntityRef,
    status: VaultServiceStatus,
) -> Result<VaultService, StoreError> {
    let mut record = store.get(entity).await?;
    record.status = Some(status);
    store.update(&record).await
}
