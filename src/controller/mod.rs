//! # Controller
//!
//! Core controller modules for the Vault status controller.
//!
//! - `aggregate`: Folds replica classifications into the cluster status
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `discovery`: Replica enumeration from labelled pods
//! - `monitor`: Per-VaultService status loop
//! - `prober`: Replica health probing and classification
//! - `reconciler`: Owning controller logic (monitor lifecycle, finalizer)
//! - `registry`: Running monitors keyed by VaultService
//! - `server`: HTTP server for metrics and health checks
//! - `store`: Optimistic read-modify-write of `.status`

pub mod aggregate;
pub mod backoff;
pub mod discovery;
pub mod monitor;
pub mod prober;
pub mod reconciler;
pub mod registry;
pub mod server;
pub mod store;
