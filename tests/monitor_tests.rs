//! Integration tests for the per-VaultService status monitor
//!
//! The monitor is driven against in-memory fakes of the Vault cluster, the
//! replica discovery and the status store.

mod common;

use common::{
    health, monitor, vault_service, FakeCluster, FakeDiscovery, FakeStore, UpdateFailure,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vault_status_controller::controller::monitor::{MonitorState, TickOutcome};
use vault_status_controller::controller::store::StoreError;
use vault_status_controller::crd::VaultServiceStatus;

const INTERVAL: Duration = Duration::from_secs(10);

fn status(initialized: bool, active: &str, sealed: &[&str]) -> VaultServiceStatus {
    VaultServiceStatus {
        initialized,
        active_node: active.to_string(),
        sealed_nodes: sealed.iter().map(|s| (*s).to_string()).collect(),
    }
}

fn healthy_cluster() -> std::sync::Arc<FakeCluster> {
    FakeCluster::new(
        Some(true),
        &[
            ("r1:8200", health(true, false, false)),
            ("r2:8200", health(true, true, false)),
            ("r3:8200", health(true, false, true)),
        ],
    )
}

#[tokio::test]
async fn test_active_sealed_and_standby_replicas_are_published() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200", "r3:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);

    let outcome = monitor.tick().await;

    assert!(outcome.is_committed(), "unexpected outcome: {outcome:?}");
    let expected = status(true, "r1:8200", &["r2:8200"]);
    assert_eq!(store.current_status(), Some(expected.clone()));
    assert_eq!(monitor.last_committed(), Some(&expected));
}

#[tokio::test]
async fn test_init_failure_keeps_previous_status() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200", "r3:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);
    assert!(monitor.tick().await.is_committed());
    let before = store.current_status();

    // Whole cluster unreachable
    cluster.set_init(None);
    for replica in ["r1:8200", "r2:8200", "r3:8200"] {
        cluster.set_replica(replica, None);
    }
    let outcome = monitor.tick().await;

    assert!(matches!(outcome, TickOutcome::InitCheckFailed(_)));
    assert_eq!(outcome.stage(), "init_check");
    assert_eq!(store.current_status(), before);
    assert_eq!(store.committed().len(), 1);
    assert_eq!(monitor.state(), MonitorState::Running);
}

#[tokio::test]
async fn test_split_brain_last_active_wins() {
    let cluster = FakeCluster::new(
        Some(true),
        &[
            ("r1:8200", health(true, false, false)),
            ("r2:8200", health(true, false, false)),
        ],
    );
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);

    assert!(monitor.tick().await.is_committed());
    assert_eq!(store.current_status(), Some(status(true, "r2:8200", &[])));
}

#[tokio::test]
async fn test_conflict_abandons_write_and_next_tick_reprobes() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200", "r3:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);
    assert!(monitor.tick().await.is_committed());
    let first = status(true, "r1:8200", &["r2:8200"]);

    // Someone else writes the record, and our next write loses the race
    let external = status(false, "", &["r1:8200", "r2:8200", "r3:8200"]);
    store.external_write(external.clone());
    store.fail_next_update(UpdateFailure::Conflict);
    cluster.set_replica("r2:8200", health(true, false, true));

    let outcome = monitor.tick().await;
    assert!(matches!(
        outcome,
        TickOutcome::CommitFailed(StoreError::Conflict(_))
    ));
    assert_eq!(outcome.stage(), "conflict");
    assert_eq!(store.current_status(), Some(external));
    // The rejected value never becomes the monitor's snapshot
    assert_eq!(monitor.last_committed(), Some(&first));

    // Next tick starts from fresh probes, not from the rejected value
    cluster.set_replica("r1:8200", health(true, true, false));
    cluster.set_replica("r3:8200", health(true, false, false));
    assert!(monitor.tick().await.is_committed());
    let fresh = status(true, "r3:8200", &["r1:8200"]);
    assert_eq!(store.current_status(), Some(fresh.clone()));
    assert_eq!(monitor.last_committed(), Some(&fresh));
    assert_eq!(store.committed(), vec![first, fresh]);
}

#[tokio::test]
async fn test_discovery_failure_abandons_tick() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200"]);
    discovery.fail();
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);

    let outcome = monitor.tick().await;

    assert!(matches!(outcome, TickOutcome::DiscoveryFailed(_)));
    assert!(store.committed().is_empty());
    assert!(monitor.last_committed().is_none());
}

#[tokio::test]
async fn test_deleted_record_is_logged_and_retried() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200"]);
    let store = FakeStore::new(None);
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);

    let first = monitor.tick().await;
    let second = monitor.tick().await;

    assert!(matches!(first, TickOutcome::CommitFailed(StoreError::NotFound(_))));
    assert!(matches!(second, TickOutcome::CommitFailed(StoreError::NotFound(_))));
    assert_eq!(cluster.init_calls(), 2);
}

#[tokio::test]
async fn test_unreachable_replicas_are_absent_from_status() {
    let cluster = FakeCluster::new(
        Some(true),
        &[
            ("r1:8200", None),
            ("r2:8200", health(true, true, false)),
        ],
    );
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200", "r3:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);

    assert!(monitor.tick().await.is_committed());
    assert_eq!(store.current_status(), Some(status(true, "", &["r2:8200"])));
}

#[tokio::test]
async fn test_membership_is_requeried_every_tick() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let mut monitor = monitor(&cluster, &discovery, &store, INTERVAL);
    assert!(monitor.tick().await.is_committed());
    assert_eq!(
        store.current_status(),
        Some(status(true, "r1:8200", &["r2:8200"]))
    );

    *discovery.addresses.lock().unwrap() = Some(vec!["r3:8200".to_string()]);
    assert!(monitor.tick().await.is_committed());
    assert_eq!(store.current_status(), Some(status(true, "", &[])));
}

#[tokio::test(start_paused = true)]
async fn test_run_ticks_on_interval_until_cancelled() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200", "r2:8200", "r3:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let token = CancellationToken::new();

    let task = tokio::spawn(monitor(&cluster, &discovery, &store, INTERVAL).run(token.clone()));

    tokio::time::sleep(Duration::from_secs(25)).await;
    token.cancel();
    let outcome = task.await.unwrap();

    assert_eq!(outcome.ticks, 2);
    assert_eq!(store.committed().len(), 2);
    assert_eq!(
        outcome.last_committed,
        Some(status(true, "r1:8200", &["r2:8200"]))
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_wins_over_pending_tick() {
    let cluster = healthy_cluster();
    let discovery = FakeDiscovery::new(&["r1:8200"]);
    let store = FakeStore::new(Some(vault_service(None)));
    let token = CancellationToken::new();
    token.cancel();

    let outcome = monitor(&cluster, &discovery, &store, INTERVAL)
        .run(token)
        .await;

    assert_eq!(outcome.ticks, 0);
    assert_eq!(cluster.init_calls(), 0);
    assert!(store.committed().is_empty());
}
