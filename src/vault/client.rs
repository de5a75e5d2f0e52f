//! Vault REST client
//!
//! Thin reqwest-based client for the two read-only status endpoints the
//! monitor needs. One [`VaultHttpClient`] is bound to exactly one address;
//! all bindings created by a connector share the same pooled
//! [`reqwest::Client`], so binding per replica costs no extra connections.
//!
//! References:
//! - [sys/init](https://developer.hashicorp.com/vault/api-docs/system/init)
//! - [sys/health](https://developer.hashicorp.com/vault/api-docs/system/health)

use super::types::{HealthResponse, InitStatusResponse, HEALTH_QUERY};
use super::{EndpointConnector, VaultEndpoint, VaultError};
use crate::config::ControllerConfig;
use crate::constants::CONTROLLER_NAME;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, debug_span, Instrument};

const INIT_PATH: &str = "/v1/sys/init";
const HEALTH_PATH: &str = "/v1/sys/health";

/// Vault client bound to a single `host:port`
#[derive(Clone)]
pub struct VaultHttpClient {
    http_client: Client,
    address: String,
    base_url: String,
}

impl std::fmt::Debug for VaultHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultHttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl VaultHttpClient {
    /// Bind a client to `address` using an existing HTTP connection pool
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidAddress`] when `scheme://address` is not a valid URL
    pub fn new(http_client: Client, scheme: &str, address: &str) -> Result<Self, VaultError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(VaultError::InvalidAddress {
                address: address.to_string(),
                reason: "address is empty".to_string(),
            });
        }

        let base_url = format!("{scheme}://{trimmed}");
        reqwest::Url::parse(&base_url).map_err(|e| VaultError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http_client,
            address: trimmed.to_string(),
            base_url,
        })
    }

    /// Base URL every request is issued against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, VaultError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| VaultError::Connection {
                address: self.address.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Protocol {
                address: self.address.clone(),
                reason: format!("unexpected status {status} from {path}: {body}"),
            });
        }

        response.json::<T>().await.map_err(|e| VaultError::Protocol {
            address: self.address.clone(),
            reason: format!("invalid response body from {path}: {e}"),
        })
    }
}

#[async_trait]
impl VaultEndpoint for VaultHttpClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn init_status(&self) -> Result<bool, VaultError> {
        let span = debug_span!("vault.init_status", vault.address = %self.address);
        let response: InitStatusResponse = self.get_json(INIT_PATH, &[]).instrument(span).await?;
        debug!(vault.address = %self.address, initialized = response.initialized, "init status");
        Ok(response.initialized)
    }

    async fn health(&self) -> Result<HealthResponse, VaultError> {
        let span = debug_span!("vault.health", vault.address = %self.address);
        self.get_json(HEALTH_PATH, &HEALTH_QUERY)
            .instrument(span)
            .await
    }
}

/// Creates [`VaultHttpClient`] bindings that share one connection pool
#[derive(Debug, Clone)]
pub struct HttpEndpointConnector {
    http_client: Client,
    scheme: String,
}

impl HttpEndpointConnector {
    /// Build the shared HTTP client with bounded request and connect timeouts
    ///
    /// # Errors
    /// Returns [`VaultError::ClientBuild`] if the TLS backend cannot be initialized
    pub fn new(config: &ControllerConfig) -> Result<Self, VaultError> {
        let http_client = Client::builder()
            .timeout(config.vault_request_timeout())
            .connect_timeout(config.vault_connect_timeout())
            .user_agent(CONTROLLER_NAME)
            .build()
            .map_err(VaultError::ClientBuild)?;

        Ok(Self {
            http_client,
            scheme: config.vault_scheme.clone(),
        })
    }

    /// Bind a concrete client, keeping the concrete type for callers that need it
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidAddress`] for malformed addresses
    pub fn bind(&self, address: &str) -> Result<VaultHttpClient, VaultError> {
        VaultHttpClient::new(self.http_client.clone(), &self.scheme, address)
    }
}

impl EndpointConnector for HttpEndpointConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn VaultEndpoint>, VaultError> {
        Ok(Arc::new(self.bind(address)?))
    }
}
