//! # Kafka
//!
//! Binds Infra resources to Strimzi Kafka clusters.

use chrono::{DateTime, FixedOffset};
use kube::api::DynamicObject;
use kube::ResourceExt;
use serde_json::Value;

use super::{conditions, BindingOutput, ObservedCondition};
use crate::controller::reconciler::properties::PropertyKey;

const PLAIN_LISTENER: &str = "plain";
const PLAIN_PORT: u16 = 9092;

pub(super) fn default_spec() -> Value {
    serde_json::json!({
        "kafka": {
            "replicas": 1,
            "listeners": [{
                "name": PLAIN_LISTENER,
                "port": PLAIN_PORT,
                "type": "internal",
                "tls": false
            }],
            "storage": { "type": "ephemeral" },
            "config": {
                "offsets.topic.replication.factor": 1,
                "transaction.state.log.replication.factor": 1,
                "transaction.state.log.min.isr": 1
            }
        },
        "zookeeper": {
            "replicas": 1,
            "storage": { "type": "ephemeral" }
        },
        "entityOperator": {
            "topicOperator": {},
            "userOperator": {}
        }
    })
}

fn transition_time(condition: &ObservedCondition<'_>) -> Option<DateTime<FixedOffset>> {
    condition
        .last_transition_time
        .and_then(|time| DateTime::parse_from_rfc3339(time).ok())
}

/// Ready when the most recent condition is Ready=True
///
/// Strimzi keeps stale conditions around, so only the latest one counts.
pub(super) fn readiness(instance: &DynamicObject) -> Result<(), String> {
    let conditions = conditions(instance);
    let latest = conditions
        .iter()
        .enumerate()
        .max_by_key(|(index, condition)| (transition_time(condition), *index))
        .map(|(_, condition)| condition);
    match latest {
        Some(condition) if condition.type_.eq_ignore_ascii_case("Ready") && condition.is_true() => {
            Ok(())
        }
        Some(condition) => Err(format!(
            "latest condition is {}={}",
            condition.type_, condition.status
        )),
        None => Err("no condition reported yet".to_string()),
    }
}

/// Bootstrap address of the plain listener
fn bootstrap_servers(instance: &DynamicObject, namespace: &str) -> String {
    instance
        .data
        .pointer("/status/listeners")
        .and_then(Value::as_array)
        .and_then(|listeners| {
            listeners.iter().find(|listener| {
                ["name", "type"].iter().any(|field| {
                    listener.get(field).and_then(Value::as_str) == Some(PLAIN_LISTENER)
                })
            })
        })
        .and_then(|listener| listener.get("bootstrapServers"))
        .and_then(Value::as_str)
        .filter(|servers| !servers.trim().is_empty())
        .map_or_else(
            || {
                format!(
                    "{}-kafka-bootstrap.{namespace}.svc:{PLAIN_PORT}",
                    instance.name_any()
                )
            },
            str::to_string,
        )
}

pub(super) fn configure(instance: &DynamicObject, namespace: &str) -> BindingOutput {
    let mut output = BindingOutput::default();
    output.values.literal(
        PropertyKey::BootstrapServers,
        bootstrap_servers(instance, namespace),
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::dispatch::BackingKind;

    fn kafka(status: Value) -> DynamicObject {
        DynamicObject::new("kogito-kafka", &BackingKind::Kafka.api_resource())
            .data(serde_json::json!({ "status": status }))
    }

    #[test]
    fn test_readiness_uses_latest_condition() {
        let recovered = kafka(serde_json::json!({"conditions": [
            {"type": "NotReady", "status": "True", "lastTransitionTime": "2024-01-01T10:00:00Z"},
            {"type": "Ready", "status": "True", "lastTransitionTime": "2024-01-01T11:00:00Z"}
        ]}));
        assert!(readiness(&recovered).is_ok());

        let degraded = kafka(serde_json::json!({"conditions": [
            {"type": "Ready", "status": "True", "lastTransitionTime": "2024-01-01T10:00:00Z"},
            {"type": "NotReady", "status": "True", "lastTransitionTime": "2024-01-01T11:00:00Z"}
        ]}));
        assert!(readiness(&degraded).is_err());

        assert!(readiness(&kafka(serde_json::json!({}))).is_err());
    }

    #[test]
    fn test_bootstrap_servers_prefers_plain_listener() {
        let instance = kafka(serde_json::json!({"listeners": [
            {"name": "tls", "bootstrapServers": "kogito-kafka-kafka-bootstrap.ns.svc:9093"},
            {"name": "plain", "bootstrapServers": "kogito-kafka-kafka-bootstrap.ns.svc:9092"}
        ]}));
        assert_eq!(
            bootstrap_servers(&instance, "ns"),
            "kogito-kafka-kafka-bootstrap.ns.svc:9092"
        );

        let legacy = kafka(serde_json::json!({"listeners": [
            {"type": "plain", "bootstrapServers": "legacy:9092"}
        ]}));
        assert_eq!(bootstrap_servers(&legacy, "ns"), "legacy:9092");
    }

    #[test]
    fn test_bootstrap_servers_fallback() {
        let instance = kafka(serde_json::json!({}));
        assert_eq!(
            bootstrap_servers(&instance, "orders"),
            "kogito-kafka-kafka-bootstrap.orders.svc:9092"
        );
    }
}
