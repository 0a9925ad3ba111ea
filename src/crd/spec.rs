//! # Infra Spec
//!
//! Main CRD specification types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Infra Custom Resource Definition
///
/// An Infra binds a process application to a backing service (cache cluster,
/// event-streaming cluster, identity provider, document store, eventing broker)
/// and receives the connection configuration for every runtime flavor in its status.
///
/// # Example
///
/// ```yaml
/// apiVersion: infra.processruntime.io/v1beta1
/// kind: Infra
/// metadata:
///   name: orders-cache
///   namespace: orders
/// spec:
///   resource:
///     apiVersion: infinispan.org/v1
///     kind: Infinispan
///   infraProperties:
///     realm: default
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "Infra",
    group = "infra.processruntime.io",
    version = "v1beta1",
    namespaced,
    status = "crate::crd::InfraStatus",
    shortname = "kinfra",
    printcolumn = r#"{"name":"Resource", "type":"string", "jsonPath":".spec.resource.kind"}, {"name":"Condition", "type":"string", "jsonPath":".status.condition.type"}, {"name":"Reason", "type":"string", "jsonPath":".status.condition.reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InfraSpec {
    /// Backing resource this Infra binds to
    /// When the name is empty, the conventional default instance is used and
    /// provisioned if it does not exist yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    /// Free-form properties consumed by the backing-type reconciler
    /// Examples: `realm`, `clientId`, `username`, `database`, `authDatabase`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub infra_properties: BTreeMap<String, String>,
}

/// Reference to a backing resource owned by a third-party operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// API version of the backing resource (e.g. `infinispan.org/v1`)
    pub api_version: String,
    /// Kind of the backing resource (e.g. `Infinispan`)
    pub kind: String,
    /// Name of the backing instance; empty means the conventional default instance
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Namespace of the backing instance
    /// Defaults to the namespace of the Infra resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl InfraSpec {
    /// Look up an infra property, treating blank values as absent
    #[must_use]
    pub fn infra_property(&self, key: &str) -> Option<&str> {
        self.infra_properties
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}
