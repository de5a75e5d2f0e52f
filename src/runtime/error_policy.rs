//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and controller stream errors.

use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::VaultService;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use kube_runtime::watcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Delay used when the backoff table cannot be accessed
const FALLBACK_BACKOFF_SECS: u64 = 60;

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing VaultService never
/// slows down the others.
pub fn handle_reconciliation_error(
    obj: Arc<VaultService>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {:?}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors();

    let (backoff_seconds, error_count) = next_backoff(
        &ctx.backoff_states,
        &format!("{namespace}/{name}"),
        ctx.config.backoff_min_secs,
        ctx.config.backoff_max_secs,
    );

    let delay = i64::try_from(backoff_seconds)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .unwrap_or_default();
    let next_trigger_time = chrono::Utc::now() + delay;
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}), next attempt at {}",
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    Action::requeue(std::time::Duration::from_secs(backoff_seconds))
}

/// Advance the backoff of `resource_key` and return `(delay_secs, error_count)`
pub fn next_backoff(
    states: &Mutex<HashMap<String, BackoffState>>,
    resource_key: &str,
    min_seconds: u64,
    max_seconds: u64,
) -> (u64, u32) {
    match states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key.to_string())
                .or_insert_with(|| BackoffState::new(min_seconds, max_seconds));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (FALLBACK_BACKOFF_SECS, 0)
        }
    }
}

/// Kind of a watch stream failure, derived from its rendered error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    TooManyRequests,
    NotFound,
    Other,
}

/// Classify an API status code
#[must_use]
pub fn classify_status_code(code: u16) -> WatchErrorKind {
    match code {
        401 => WatchErrorKind::Unauthorized,
        404 => WatchErrorKind::NotFound,
        410 => WatchErrorKind::Expired,
        429 => WatchErrorKind::TooManyRequests,
        _ => WatchErrorKind::Other,
    }
}

/// Classify a watch stream failure
///
/// API errors are classified by their status code. Everything else falls
/// back to the rendered message.
#[must_use]
pub fn classify_watcher_error(error: &watcher::Error) -> WatchErrorKind {
    match error {
        watcher::Error::InitialListFailed(kube::Error::Api(response))
        | watcher::Error::WatchStartFailed(kube::Error::Api(response))
        | watcher::Error::WatchFailed(kube::Error::Api(response)) => {
            classify_status_code(response.code)
        }
        other => classify_watch_error(&format!("{other:?}")),
    }
}

/// Classify a watch error message
///
/// Only status codes rendered as `code: NNN` count, so digits inside a
/// resource version are never taken for a status. 404 is checked before 401
/// since a not-found body can surface with a `WatchFailed` chain that also
/// mentions authorization.
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    let has_code = |code: &str| error_string.contains(&format!("code: {code}"));

    let is_not_found =
        has_code("404") || error_string.contains("ObjectNotFound") || error_string.contains("not found");
    if is_not_found {
        return WatchErrorKind::NotFound;
    }
    if has_code("401") || error_string.contains("Unauthorized") {
        return WatchErrorKind::Unauthorized;
    }
    if has_code("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        return WatchErrorKind::Expired;
    }
    if has_code("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        return WatchErrorKind::TooManyRequests;
    }
    WatchErrorKind::Other
}

/// Log an error yielded by the controller stream
///
/// Reconciler failures were already handled by the error policy. The
/// controller keeps running for every kind of error.
pub fn handle_controller_error(error: &controller::Error<ReconcilerError, watcher::Error>) {
    match error {
        controller::Error::ReconcilerFailed(e, obj) => {
            debug!("reconciliation of {} failed: {}", obj, e);
        }
        controller::Error::QueueError(e) => {
            let error_string = format!("{e:?}");
            match classify_watcher_error(e) {
                WatchErrorKind::Unauthorized => {
                    error!(
                        error_type = "401",
                        "Watch authentication failed (401 Unauthorized); RBAC may have been revoked or the token expired"
                    );
                    error!("Verify: kubectl auth can-i watch vaultservices --as=system:serviceaccount:<namespace>:vault-status-controller --all-namespaces");
                }
                WatchErrorKind::Expired => {
                    warn!(error_type = "410", "Watch resource version expired, the watch restarts");
                }
                WatchErrorKind::TooManyRequests => {
                    warn!(error_type = "429", "API server storage reinitializing, the watch backs off");
                }
                WatchErrorKind::NotFound => {
                    warn!(
                        error_type = "404",
                        "VaultService resource not found (404); the CRD may be missing. Error: {}",
                        error_string
                    );
                }
                WatchErrorKind::Other => {
                    error!("Controller watch error: {}", error_string);
                }
            }
        }
        other => {
            error!("Controller stream error: {}", other);
        }
    }
}
