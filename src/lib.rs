//! Vault Status Controller Library
//!
//! Core functionality of the Vault status controller: the `VaultService`
//! custom resource, the Vault HTTP status client, and the per-resource
//! monitor that probes every replica and publishes the aggregate status.
//!
//! ## Quick Start
//!
//! ```rust
//! use vault_status_controller::prelude::*;
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod vault;
