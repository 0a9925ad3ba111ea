//! # Keycloak
//!
//! Binds Infra resources to Keycloak identity providers.

use kube::api::DynamicObject;
use serde_json::Value;

use super::{bool_field, str_field, BindingOutput};
use crate::controller::reconciler::context::ClusterContext;
use crate::controller::reconciler::properties::PropertyKey;

const DEFAULT_REALM: &str = "kogito";

pub(super) fn default_spec() -> Value {
    serde_json::json!({
        "instances": 1,
        "externalAccess": { "enabled": true }
    })
}

pub(super) fn readiness(instance: &DynamicObject) -> Result<(), String> {
    if bool_field(instance, "/status/ready") == Some(true) {
        Ok(())
    } else {
        Err("status.ready is not true".to_string())
    }
}

pub(super) fn configure(
    ctx: &ClusterContext<'_>,
    instance: &DynamicObject,
    namespace: &str,
) -> BindingOutput {
    let base_url = str_field(instance, "/status/internalURL")
        .map_or_else(
            || format!("https://keycloak.{namespace}.svc:8443"),
            str::to_string,
        )
        .trim_end_matches('/')
        .to_string();
    let realm = ctx.infra_property("realm").unwrap_or(DEFAULT_REALM);

    let mut output = BindingOutput::default();
    output
        .values
        .literal(PropertyKey::AuthServerUrl, format!("{base_url}/auth"))
        .literal(
            PropertyKey::RealmUrl,
            format!("{base_url}/auth/realms/{realm}"),
        )
        .literal(PropertyKey::Realm, realm);
    if let Some(client_id) = ctx.infra_property("clientId") {
        output.values.literal(PropertyKey::ClientId, client_id);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::dispatch::BackingKind;

    #[test]
    fn test_readiness_requires_ready_flag() {
        let ar = BackingKind::Keycloak.api_resource();
        let ready = DynamicObject::new("kogito-keycloak", &ar)
            .data(serde_json::json!({"status": {"ready": true}}));
        assert!(readiness(&ready).is_ok());

        let pending = DynamicObject::new("kogito-keycloak", &ar)
            .data(serde_json::json!({"status": {"ready": false}}));
        assert!(readiness(&pending).is_err());
    }
}
