//! # Monitor Registry
//!
//! Owns the background monitor task of every VaultService.
//!
//! At most one monitor runs per entity. Each task gets a child of the
//! registry's root cancellation token, so stopping one entity or shutting the
//! whole registry down uses the same path.

use super::monitor::{MonitorOutcome, StatusMonitor};
use super::store::EntityRef;
use crate::observability::metrics;
use crate::vault::VaultError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct MonitorHandle {
    token: CancellationToken,
    task: JoinHandle<MonitorOutcome>,
}

/// Registry of running status monitors keyed by entity
pub struct MonitorRegistry {
    root: CancellationToken,
    monitors: Mutex<HashMap<EntityRef, MonitorHandle>>,
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("active", &self.active_count())
            .field("shutdown", &self.root.is_cancelled())
            .finish()
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            monitors: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityRef, MonitorHandle>> {
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a monitor for `entity` unless one is already running
    ///
    /// `factory` is only called when a new monitor has to be started. A task
    /// that already finished on its own is replaced. Returns `true` if a
    /// monitor was started.
    ///
    /// # Errors
    /// Propagates the factory error; nothing is registered in that case.
    pub fn ensure<F>(&self, entity: &EntityRef, factory: F) -> Result<bool, VaultError>
    where
        F: FnOnce() -> Result<StatusMonitor, VaultError>,
    {
        if self.root.is_cancelled() {
            debug!("registry is shut down, not starting a monitor for {}", entity);
            return Ok(false);
        }

        let mut monitors = self.lock();
        if monitors
            .get(entity)
            .is_some_and(|existing| !existing.task.is_finished())
        {
            return Ok(false);
        }

        let monitor = factory()?;
        let token = self.root.child_token();
        let task = tokio::spawn(monitor.run(token.clone()));
        monitors.insert(entity.clone(), MonitorHandle { token, task });
        metrics::set_active_monitors(monitors.len());

        info!(
            resource.name = entity.name.as_str(),
            resource.namespace = entity.namespace.as_str(),
            "monitor started"
        );
        Ok(true)
    }

    /// Cancel the monitor of `entity` and wait for it to finish
    ///
    /// Returns `None` if no monitor was registered or the task panicked.
    pub async fn stop(&self, entity: &EntityRef) -> Option<MonitorOutcome> {
        let handle = {
            let mut monitors = self.lock();
            let handle = monitors.remove(entity);
            metrics::set_active_monitors(monitors.len());
            handle
        }?;

        handle.token.cancel();
        match handle.task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("monitor task for {} did not finish cleanly: {}", entity, e);
                None
            }
        }
    }

    /// Cancel every monitor and wait for all of them
    ///
    /// No monitor can be started afterwards.
    pub async fn shutdown(&self) -> Vec<MonitorOutcome> {
        self.root.cancel();
        let handles: Vec<(EntityRef, MonitorHandle)> = self.lock().drain().collect();
        metrics::set_active_monitors(0);

        info!("stopping {} vault monitors", handles.len());
        let mut outcomes = Vec::with_capacity(handles.len());
        for (entity, handle) in handles {
            match handle.task.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("monitor task for {} did not finish cleanly: {}", entity, e),
            }
        }
        outcomes
    }

    #[must_use]
    pub fn is_running(&self, entity: &EntityRef) -> bool {
        self.lock()
            .get(entity)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}
