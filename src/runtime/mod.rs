//! # Runtime
//!
//! Process-level wiring of the controller.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and clients
//! - `watch_loop`: the VaultService controller loop and graceful shutdown
//! - `error_policy`: reconciliation backoff and watch error handling

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
