//! # Custom Resource Definitions
//!
//! CRD types for the Vault status controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - VaultService specification and default values
//! - `status.rs` - Aggregate cluster status written by the monitor

mod spec;
mod status;

pub use spec::{default_false, default_nodes, VaultService, VaultServiceSpec};
pub use status::VaultServiceStatus;
