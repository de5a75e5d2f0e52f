//! Pact contract tests for the Vault status API
//!
//! These tests define the contract between the Vault Status Controller and the
//! two read-only Vault endpoints it consumes. Requests are issued through
//! `VaultHttpClient`, so the contract covers the real request shape
//! (paths and health query overrides) and the real response decoding.

mod common;

use common::init_rustls;
use pact_consumer::prelude::*;
use serde_json::json;
use vault_status_controller::config::ControllerConfig;
use vault_status_controller::controller::prober::{classify, ReplicaClassification};
use vault_status_controller::vault::{HttpEndpointConnector, VaultEndpoint, VaultError};

const CONSUMER: &str = "Vault-Status-Controller";
const PROVIDER: &str = "Vault";

/// `host:port` of a pact mock server, from its `http://host:port/` url
fn mock_address(url: &str) -> String {
    url.trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

fn connector() -> HttpEndpointConnector {
    HttpEndpointConnector::new(&ControllerConfig::default()).expect("Failed to build HTTP client")
}

fn health_interaction(
    builder: &mut PactBuilder,
    description: &str,
    state: &str,
    body: serde_json::Value,
) {
    builder.interaction(description, "", |mut i| {
        i.given(state);
        i.request
            .method("GET")
            .path("/v1/sys/health")
            .query_param("uninitcode", "299")
            .query_param("sealedcode", "299")
            .query_param("standbycode", "299")
            .query_param("drsecondarycode", "299")
            .query_param("performancestandbycode", "299");
        i.response
            .status(299)
            .header("content-type", "application/json")
            .json_body(body);
        i
    });
}

#[tokio::test]
async fn test_vault_init_status_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("get the initialization status", "", |mut i| {
        i.given("the vault cluster is initialized");
        i.request.method("GET").path("/v1/sys/init");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "initialized": true }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = connector()
        .bind(&mock_address(mock_server.url().as_str()))
        .expect("Failed to bind client");

    let initialized = client.init_status().await.expect("init status request failed");
    assert!(initialized);
}

#[tokio::test]
async fn test_vault_health_active_replica_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    health_interaction(
        &mut pact_builder,
        "get the health of the active replica",
        "the replica is the unsealed leader",
        json!({
            "initialized": true,
            "sealed": false,
            "standby": false,
            "performance_standby": false,
            "replication_performance_mode": "disabled",
            "replication_dr_mode": "disabled",
            "server_time_utc": 1_516_639_589,
            "version": "0.9.1",
            "cluster_name": "vault-cluster-3bd69ca2",
            "cluster_id": "00af5aa8-c87d-b5fc-e82e-97cd8dfaf731"
        }),
    );

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = connector()
        .bind(&mock_address(mock_server.url().as_str()))
        .expect("Failed to bind client");

    let health = client.health().await.expect("health request failed");
    assert_eq!(health.version.as_deref(), Some("0.9.1"));
    assert_eq!(classify(&health), ReplicaClassification::Active);
}

#[tokio::test]
async fn test_vault_health_sealed_replica_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    health_interaction(
        &mut pact_builder,
        "get the health of a sealed replica",
        "the replica is sealed",
        json!({
            "initialized": true,
            "sealed": true,
            "standby": true,
            "server_time_utc": 1_516_639_589,
            "version": "0.9.1"
        }),
    );

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = connector()
        .bind(&mock_address(mock_server.url().as_str()))
        .expect("Failed to bind client");

    let health = client.health().await.expect("health request failed");
    assert_eq!(classify(&health), ReplicaClassification::Sealed);
}

#[tokio::test]
async fn test_vault_health_standby_replica_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    health_interaction(
        &mut pact_builder,
        "get the health of a standby replica",
        "the replica is an unsealed standby",
        json!({
            "initialized": true,
            "sealed": false,
            "standby": true,
            "server_time_utc": 1_516_639_589,
            "version": "0.9.1"
        }),
    );

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = connector()
        .bind(&mock_address(mock_server.url().as_str()))
        .expect("Failed to bind client");

    let health = client.health().await.expect("health request failed");
    assert_eq!(classify(&health), ReplicaClassification::StandbyUnsealed);
}

#[tokio::test]
async fn test_vault_error_status_is_protocol_error_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("get the initialization status while vault is failing", "", |mut i| {
        i.given("the vault server is failing");
        i.request.method("GET").path("/v1/sys/init");
        i.response
            .status(500)
            .header("content-type", "application/json")
            .json_body(json!({ "errors": ["internal error"] }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = connector()
        .bind(&mock_address(mock_server.url().as_str()))
        .expect("Failed to bind client");

    let err = client.init_status().await.unwrap_err();
    assert!(matches!(err, VaultError::Protocol { .. }), "unexpected error: {err}");
}
