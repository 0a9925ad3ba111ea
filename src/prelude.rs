//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use infra_binding_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (`Infra`, `InfraStatus`, `RuntimeProperties`, etc.)
//! - The binding engine and its object stores
//! - Config types

// CRD types - most commonly used
pub use crate::crd::*;

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    BackingKind, BindingController, InMemoryStore, InfraError, KubeStore, ObjectStore,
    ReconcileOutcome, Reconciler, ReconcilerError, StoreError,
};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, SharedControllerConfig};
