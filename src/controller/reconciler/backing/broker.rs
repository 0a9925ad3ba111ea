//! # Knative Broker
//!
//! Binds Infra resources to Knative Eventing brokers. Applications publish
//! CloudEvents to the broker address.

use kube::api::DynamicObject;
use kube::ResourceExt;
use serde_json::Value;

use super::{condition_ready, str_field, BindingOutput};
use crate::controller::reconciler::error::InfraError;
use crate::controller::reconciler::properties::PropertyKey;

const HTTP_CONNECTOR: &str = "quarkus-http";

pub(super) fn default_spec() -> Value {
    serde_json::json!({})
}

pub(super) fn readiness(instance: &DynamicObject) -> Result<(), String> {
    condition_ready(instance, "Ready")
}

pub(super) fn configure(instance: &DynamicObject) -> Result<BindingOutput, InfraError> {
    let url = str_field(instance, "/status/address/url").ok_or_else(|| {
        InfraError::config(
            "Broker",
            &instance.name_any(),
            "status.address.url is not set",
        )
    })?;

    let mut output = BindingOutput::default();
    output
        .values
        .literal(PropertyKey::SinkUrl, url)
        .literal(PropertyKey::Connector, HTTP_CONNECTOR);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::dispatch::BackingKind;
    use crate::controller::reconciler::properties::PropertyValue;
    use crate::crd::InfraConditionReason;

    fn broker(data: Value) -> DynamicObject {
        DynamicObject::new("default", &BackingKind::Broker.api_resource()).data(data)
    }

    #[test]
    fn test_readiness_follows_ready_condition() {
        let ready = broker(serde_json::json!({
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }));
        assert!(readiness(&ready).is_ok());

        let pending = broker(serde_json::json!({
            "status": {"conditions": [{"type": "Ready", "status": "False"}]}
        }));
        assert!(readiness(&pending).is_err());

        assert!(readiness(&broker(serde_json::json!({}))).is_err());
    }

    #[test]
    fn test_configure_without_address_is_a_config_error() {
        let instance = broker(serde_json::json!({
            "status": {"conditions": [{"type": "Ready", "status": "True"}]}
        }));
        let err = configure(&instance).unwrap_err();
        assert_eq!(err.reason(), InfraConditionReason::ResourceConfigError);
        assert!(err.to_string().contains("status.address.url"));
    }

    #[test]
    fn test_configure_publishes_sink_url() {
        let url = "http://broker-ingress.knative-eventing.svc.cluster.local/ns/default";
        let instance = broker(serde_json::json!({"status": {"address": {"url": url}}}));

        let output = configure(&instance).unwrap();
        assert_eq!(
            output.values.get(PropertyKey::SinkUrl),
            Some(&PropertyValue::Literal(url.to_string()))
        );
        assert_eq!(
            output.values.get(PropertyKey::Connector),
            Some(&PropertyValue::Literal(HTTP_CONNECTOR.to_string()))
        );
    }
}
