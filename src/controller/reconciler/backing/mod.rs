//! # Backing-Type Reconcilers
//!
//! One module per backing kind, driven through a common protocol on every pass:
//!
//! 1. the backing API must be installed and serve the declared version
//! 2. the named instance is fetched, or the conventional default instance is
//!    fetched and provisioned when missing
//! 3. the instance must report itself ready
//! 4. credentials and trust material are derived where the kind needs them
//! 5. connection settings are projected through the property table of every
//!    runtime flavor and recorded on the draft status
//!
//! Nothing is recorded until every flavor has been synthesized, so a failing
//! pass never leaves half-written runtime properties behind.

mod broker;
mod infinispan;
mod kafka;
mod keycloak;
mod mongodb;

use kube::api::{ApiResource, DynamicObject};
use kube::ResourceExt;
use serde_json::Value;
use tracing::{debug, info};

use crate::controller::reconciler::context::ClusterContext;
use crate::controller::reconciler::dispatch::BackingKind;
use crate::controller::reconciler::error::InfraError;
use crate::controller::reconciler::properties::{self, PropertyValues};
use crate::controller::reconciler::status;
use crate::controller::reconciler::store::StoreError;
use crate::controller::reconciler::types::ReconcileOutcome;
use crate::crd::{Infra, InfraVolume, ResourceRef, RuntimeFlavor};
use crate::observability::metrics;

/// Connection settings and volumes derived from a ready backing instance
#[derive(Debug, Default)]
pub(crate) struct BindingOutput {
    pub values: PropertyValues,
    pub volumes: Vec<InfraVolume>,
}

enum Resolution {
    Found(Box<DynamicObject>),
    Provisioned,
}

/// Bind `draft` to the backing instance described by `resource`
///
/// On `Done` the draft carries runtime properties for every flavor and the
/// volumes to mount. On `Requeue` and on errors it is left untouched.
///
/// # Errors
///
/// Classified [`InfraError`]s for every way binding can fail
pub async fn reconcile_backing(
    ctx: &ClusterContext<'_>,
    kind: BackingKind,
    resource: &ResourceRef,
    draft: &mut Infra,
) -> Result<ReconcileOutcome, InfraError> {
    let api = kind.api_resource();
    ensure_api_available(ctx, kind, &api).await?;

    let instance = match resolve_or_provision(ctx, kind, &api, resource).await? {
        Resolution::Found(instance) => instance,
        Resolution::Provisioned => return Ok(ReconcileOutcome::Requeue),
    };
    let name = instance.name_any();
    let namespace = instance
        .namespace()
        .unwrap_or_else(|| ctx.namespace.clone());

    readiness(kind, &instance)
        .map_err(|detail| InfraError::not_ready(kind.kind(), &name, &namespace, detail))?;

    let output = match kind {
        BackingKind::Infinispan => infinispan::configure(ctx, &instance).await?,
        BackingKind::Kafka => kafka::configure(&instance, &namespace),
        BackingKind::Keycloak => keycloak::configure(ctx, &instance, &namespace),
        BackingKind::MongoDb => mongodb::configure(ctx, &instance).await?,
        BackingKind::Broker => broker::configure(&instance)?,
    };

    let mut published = Vec::with_capacity(RuntimeFlavor::ALL.len());
    for flavor in RuntimeFlavor::ALL {
        let props = properties::synthesize(kind, flavor, &output.values)
            .map_err(|err| InfraError::config(kind.kind(), &name, err.to_string()))?;
        published.push((flavor, props));
    }
    for (flavor, props) in published {
        status::set_runtime_properties(draft, flavor, props);
    }
    status::set_volumes(draft, output.volumes);

    info!(
        backing.kind = %kind,
        backing.name = %name,
        backing.namespace = %namespace,
        "runtime properties published"
    );
    Ok(ReconcileOutcome::Done)
}

async fn ensure_api_available(
    ctx: &ClusterContext<'_>,
    kind: BackingKind,
    api: &ApiResource,
) -> Result<(), InfraError> {
    if ctx.store.api_available(api).await? {
        Ok(())
    } else {
        Err(InfraError::ApiNotFound {
            kind: kind.kind().to_string(),
            api_version: api.api_version.clone(),
        })
    }
}

async fn resolve_or_provision(
    ctx: &ClusterContext<'_>,
    kind: BackingKind,
    api: &ApiResource,
    resource: &ResourceRef,
) -> Result<Resolution, InfraError> {
    let name = resource.name.trim();
    if !name.is_empty() {
        let namespace = resource
            .namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(ctx.namespace.as_str());
        return match ctx.store.get_dynamic(api, namespace, name).await? {
            Some(instance) => Ok(Resolution::Found(Box::new(instance))),
            None => Err(InfraError::ResourceNotFound {
                kind: kind.kind().to_string(),
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
        };
    }

    let default_name = kind.default_instance_name();
    let existing = ctx.store.get_dynamic(api, &ctx.namespace, default_name);
    if let Some(instance) = existing.await? {
        return Ok(Resolution::Found(Box::new(instance)));
    }

    let Some(spec) = default_spec(kind) else {
        return Err(InfraError::ResourceNotFound {
            kind: kind.kind().to_string(),
            name: default_name.to_string(),
            namespace: ctx.namespace.clone(),
        });
    };

    let mut object = DynamicObject::new(default_name, api)
        .within(&ctx.namespace)
        .data(serde_json::json!({ "spec": spec }));
    object.metadata.labels = Some(ctx.labels());

    match ctx.store.create_dynamic(api, &ctx.namespace, &object).await {
        Ok(_) => {
            info!(
                backing.kind = %kind,
                backing.name = %default_name,
                backing.namespace = %ctx.namespace,
                "provisioned default backing instance"
            );
            metrics::increment_backing_instances_provisioned(kind.metric_label());
        }
        // Another pass provisioned it first
        Err(StoreError::AlreadyExists { .. }) => {
            debug!(
                backing.kind = %kind,
                backing.name = %default_name,
                "default backing instance already provisioned"
            );
        }
        Err(err) => return Err(err.into()),
    }
    Ok(Resolution::Provisioned)
}

/// Minimal spec used to provision the default instance, `None` if the kind
/// is never provisioned
fn default_spec(kind: BackingKind) -> Option<Value> {
    match kind {
        BackingKind::Infinispan => Some(infinispan::default_spec()),
        BackingKind::Kafka => Some(kafka::default_spec()),
        BackingKind::Keycloak => Some(keycloak::default_spec()),
        BackingKind::Broker => Some(broker::default_spec()),
        // User records and their password secrets cannot be invented
        BackingKind::MongoDb => None,
    }
}

fn readiness(kind: BackingKind, instance: &DynamicObject) -> Result<(), String> {
    match kind {
        BackingKind::Infinispan => infinispan::readiness(instance),
        BackingKind::Kafka => kafka::readiness(instance),
        BackingKind::Keycloak => keycloak::readiness(instance),
        BackingKind::MongoDb => mongodb::readiness(instance),
        BackingKind::Broker => broker::readiness(instance),
    }
}

/// Non-blank string at a JSON pointer of the instance
fn str_field<'a>(instance: &'a DynamicObject, pointer: &str) -> Option<&'a str> {
    instance
        .data
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Boolean at a JSON pointer, accepting `"true"`/`"false"` strings
fn bool_field(instance: &DynamicObject, pointer: &str) -> Option<bool> {
    match instance.data.pointer(pointer)? {
        Value::Bool(value) => Some(*value),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Condition reported under `status.conditions`
#[derive(Debug)]
struct ObservedCondition<'a> {
    type_: &'a str,
    status: &'a str,
    last_transition_time: Option<&'a str>,
}

impl ObservedCondition<'_> {
    fn is_true(&self) -> bool {
        self.status.eq_ignore_ascii_case("true")
    }
}

fn conditions(instance: &DynamicObject) -> Vec<ObservedCondition<'_>> {
    instance
        .data
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .map(|conditions| {
            conditions
                .iter()
                .filter_map(|condition| {
                    Some(ObservedCondition {
                        type_: condition.get("type")?.as_str()?,
                        status: condition.get("status")?.as_str()?,
                        last_transition_time: condition
                            .get("lastTransitionTime")
                            .and_then(Value::as_str),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Ready when the condition `condition_type` is True
fn condition_ready(instance: &DynamicObject, condition_type: &str) -> Result<(), String> {
    match conditions(instance)
        .iter()
        .find(|condition| condition.type_.eq_ignore_ascii_case(condition_type))
    {
        Some(condition) if condition.is_true() => Ok(()),
        Some(condition) => Err(format!("condition {condition_type} is {}", condition.status)),
        None => Err(format!("condition {condition_type} not reported yet")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(data: Value) -> DynamicObject {
        DynamicObject::new("instance", &BackingKind::Infinispan.api_resource()).data(data)
    }

    #[test]
    fn test_condition_ready_is_case_insensitive() {
        let ready = instance(serde_json::json!({
            "status": {"conditions": [{"type": "WellFormed", "status": "true"}]}
        }));
        assert!(condition_ready(&ready, "WellFormed").is_ok());

        let not_ready = instance(serde_json::json!({
            "status": {"conditions": [{"type": "WellFormed", "status": "False"}]}
        }));
        assert_eq!(
            condition_ready(&not_ready, "WellFormed").unwrap_err(),
            "condition WellFormed is False"
        );

        let empty = instance(serde_json::json!({}));
        assert!(condition_ready(&empty, "WellFormed").is_err());
    }

    #[test]
    fn test_field_helpers() {
        let object = instance(serde_json::json!({
            "spec": {"security": {"endpointAuthentication": "false", "endpointSecretName": "  "}}
        }));
        assert_eq!(
            bool_field(&object, "/spec/security/endpointAuthentication"),
            Some(false)
        );
        assert_eq!(
            str_field(&object, "/spec/security/endpointSecretName"),
            None
        );
        assert_eq!(bool_field(&object, "/spec/missing"), None);
    }

    #[test]
    fn test_only_document_stores_are_never_provisioned() {
        for kind in BackingKind::ALL {
            assert_eq!(default_spec(kind).is_none(), kind == BackingKind::MongoDb);
        }
    }
}
