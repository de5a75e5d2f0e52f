//! # Configuration
//!
//! Process-wide settings for the controller, read once at startup.

mod controller;

pub use controller::ControllerConfig;
