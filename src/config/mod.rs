//! # Configuration
//!
//! Process-level configuration for the controller.
//!
//! Configuration is read once at startup from environment variables and shared
//! read-only with every reconciliation.

mod controller;

use std::sync::Arc;

pub use controller::ControllerConfig;

/// Controller configuration shared across reconciliations
pub type SharedControllerConfig = Arc<ControllerConfig>;
