//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `vault_status_reconciliations_total` - Total number of VaultService reconciliations
//! - `vault_status_reconciliation_errors_total` - Total number of reconciliation errors
//! - `vault_status_monitor_ticks_total` - Total number of probe cycles started
//! - `vault_status_monitor_tick_errors_total` - Probe cycles abandoned, by stage
//! - `vault_status_monitor_tick_duration_seconds` - Duration of probe cycles
//! - `vault_status_replica_probes_total` - Replica probe outcomes, by classification
//! - `vault_status_updates_total` - Status records committed
//! - `vault_status_update_conflicts_total` - Status commits rejected by optimistic concurrency
//! - `vault_status_active_monitors` - Number of running monitors

use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_status_reconciliations_total",
        "Total number of VaultService reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_status_reconciliation_errors_total",
        "Total number of VaultService reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static MONITOR_TICKS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_status_monitor_ticks_total",
        "Total number of status probe cycles started",
    )
    .expect("Failed to create MONITOR_TICKS_TOTAL metric - this should never happen")
});

static MONITOR_TICK_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "vault_status_monitor_tick_errors_total",
            "Total number of abandoned probe cycles by failing stage",
        ),
        &["stage"],
    )
    .expect("Failed to create MONITOR_TICK_ERRORS_TOTAL metric - this should never happen")
});

static MONITOR_TICK_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "vault_status_monitor_tick_duration_seconds",
            "Duration of status probe cycles in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create MONITOR_TICK_DURATION metric - this should never happen")
});

static REPLICA_PROBES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "vault_status_replica_probes_total",
            "Total number of replica health probes by classification",
        ),
        &["classification"],
    )
    .expect("Failed to create REPLICA_PROBES_TOTAL metric - this should never happen")
});

static STATUS_UPDATES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_status_updates_total",
        "Total number of VaultService status records committed",
    )
    .expect("Failed to create STATUS_UPDATES_TOTAL metric - this should never happen")
});

static STATUS_UPDATE_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_status_update_conflicts_total",
        "Total number of status commits rejected because the record changed",
    )
    .expect("Failed to create STATUS_UPDATE_CONFLICTS_TOTAL metric - this should never happen")
});

static ACTIVE_MONITORS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "vault_status_active_monitors",
        "Current number of running VaultService monitors",
    )
    .expect("Failed to create ACTIVE_MONITORS metric - this should never happen")
});

/// Register every metric with the controller registry
///
/// Registering again is a no-op.
///
/// # Errors
/// Fails if a collector clashes with a different one of the same name.
pub fn register_metrics() -> Result<()> {
    register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    register(Box::new(MONITOR_TICKS_TOTAL.clone()))?;
    register(Box::new(MONITOR_TICK_ERRORS_TOTAL.clone()))?;
    register(Box::new(MONITOR_TICK_DURATION.clone()))?;
    register(Box::new(REPLICA_PROBES_TOTAL.clone()))?;
    register(Box::new(STATUS_UPDATES_TOTAL.clone()))?;
    register(Box::new(STATUS_UPDATE_CONFLICTS_TOTAL.clone()))?;
    register(Box::new(ACTIVE_MONITORS.clone()))?;
    Ok(())
}

fn register(collector: Box<dyn Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Collect every registered metric family
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn increment_monitor_ticks() {
    MONITOR_TICKS_TOTAL.inc();
}

/// Count an abandoned tick; `stage` is `init_check`, `discovery`, `conflict` or `commit`
pub fn increment_monitor_tick_errors(stage: &str) {
    MONITOR_TICK_ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

pub fn observe_monitor_tick_duration(duration: f64) {
    MONITOR_TICK_DURATION.observe(duration);
}

pub fn record_replica_probe(classification: &str) {
    REPLICA_PROBES_TOTAL
        .with_label_values(&[classification])
        .inc();
}

pub fn increment_status_updates() {
    STATUS_UPDATES_TOTAL.inc();
}

pub fn increment_status_update_conflicts() {
    STATUS_UPDATE_CONFLICTS_TOTAL.inc();
}

pub fn set_active_monitors(count: usize) {
    ACTIVE_MONITORS.set(i64::try_from(count).unwrap_or(i64::MAX));
}
