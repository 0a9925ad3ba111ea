//! # Cluster Context
//!
//! Everything a backing-type reconciler needs for one pass: the store handle,
//! the namespace it works in, and the Infra that owns whatever gets created.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use crate::constants::{INFRA_NAME_LABEL, MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::controller::reconciler::store::ObjectStore;
use crate::crd::Infra;

/// Per-pass context handed to every reconciler call
pub struct ClusterContext<'a> {
    pub store: &'a dyn ObjectStore,
    /// Namespace of the owning Infra
    pub namespace: String,
    pub owner: &'a Infra,
    pub conflict_retry_attempts: u32,
}

impl std::fmt::Debug for ClusterContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterContext")
            .field("namespace", &self.namespace)
            .field("owner", &self.owner.name_any())
            .finish_non_exhaustive()
    }
}

impl<'a> ClusterContext<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore, owner: &'a Infra, conflict_retry_attempts: u32) -> Self {
        Self {
            store,
            namespace: owner.namespace().unwrap_or_else(|| "default".to_string()),
            owner,
            conflict_retry_attempts,
        }
    }

    /// Labels stamped on every object the engine creates
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
            (INFRA_NAME_LABEL.to_string(), self.owner.name_any()),
        ])
    }

    /// Controller owner reference to the Infra
    ///
    /// `None` when the Infra has not been persisted yet and has no uid.
    #[must_use]
    pub fn owner_reference(&self) -> Option<OwnerReference> {
        self.owner.controller_owner_ref(&())
    }

    /// Metadata for an owned object created in the Infra namespace
    #[must_use]
    pub fn owned_metadata(&self, name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels()),
            owner_references: self.owner_reference().map(|owner| vec![owner]),
            ..ObjectMeta::default()
        }
    }

    /// Infra property, blank values treated as absent
    #[must_use]
    pub fn infra_property(&self, key: &str) -> Option<&str> {
        self.owner.spec.infra_property(key)
    }
}
