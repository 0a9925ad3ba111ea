//! # Reconciler
//!
//! Core reconciliation logic for `Infra` resources.
//!
//! The reconciler:
//! - Resolves the backing kind an Infra references (Infinispan, Kafka,
//!   Keycloak, MongoDB Community, Knative Broker)
//! - Finds the backing instance, provisioning a default one when none is named
//! - Waits for the instance to report ready
//! - Derives credential and trust-store Secrets owned by the Infra
//! - Publishes runtime properties for every application runtime flavor
//!
//! ## Reconciliation Flow
//!
//! 1. Dispatch on `kind` + `apiVersion` of `spec.resource`
//! 2. Check the backing API is installed
//! 3. Resolve or provision the backing instance
//! 4. Gate on readiness
//! 5. Derive credentials and trust material
//! 6. Synthesize properties and write the status

pub mod backing;
pub mod context;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod kube_store;
pub mod memory;
pub mod properties;
pub mod reconcile;
pub mod status;
pub mod store;
pub mod types;

pub use context::ClusterContext;
pub use dispatch::BackingKind;
pub use error::InfraError;
pub use kube_store::KubeStore;
pub use memory::InMemoryStore;
pub use reconcile::{resource_key, BindingController};
pub use store::{retry_on_conflict, ObjectStore, StoreError};
pub use types::{BackoffState, ReconcileOutcome, Reconciler, ReconcilerError, TriggerSource};
