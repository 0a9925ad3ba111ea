//! Common fixtures for binding integration tests
//!
//! Builds an in-memory cluster with every backing API installed, plus ready
//! backing instances and the Secrets their operators would generate.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::BTreeMap;

use base64::Engine;
use infra_binding_controller::controller::reconciler::{
    BackingKind, BindingController, InMemoryStore, InfraError, ObjectStore, ReconcileOutcome,
};
use infra_binding_controller::crd::{Infra, InfraSpec, ResourceRef, RuntimeProperties};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::DynamicObject;
use serde_json::{json, Value};
use std::sync::Arc;

pub const NAMESPACE: &str = "orders";

/// Store with the APIs of every backing kind installed
pub fn cluster() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for kind in BackingKind::ALL {
        store.install_api(&kind.api_resource());
    }
    Arc::new(store)
}

pub fn controller(store: &Arc<InMemoryStore>) -> BindingController {
    BindingController::new(store.clone(), 5)
}

/// One pass over the Infra `name` in the test namespace
pub async fn reconcile(
    store: &Arc<InMemoryStore>,
    name: &str,
) -> Result<ReconcileOutcome, InfraError> {
    controller(store).reconcile(NAMESPACE, name).await
}

/// Infra referencing `instance` of `kind`, empty name for the default instance
pub fn infra(name: &str, kind: BackingKind, instance: &str, properties: &[(&str, &str)]) -> Infra {
    Infra::new(
        name,
        InfraSpec {
            resource: Some(ResourceRef {
                api_version: kind.api_version(),
                kind: kind.kind().to_string(),
                name: instance.to_string(),
                namespace: None,
            }),
            infra_properties: properties
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        },
    )
}

pub fn put_instance(store: &InMemoryStore, kind: BackingKind, name: &str, data: Value) {
    let api = kind.api_resource();
    store.put_dynamic(&api, NAMESPACE, DynamicObject::new(name, &api).data(data));
}

pub fn ready_infinispan(encryption: Option<&str>) -> Value {
    let mut security = json!({ "endpointAuthentication": true });
    if let Some(cert_secret) = encryption {
        security["endpointEncryption"] = json!({ "type": "Secret", "certSecretName": cert_secret });
    }
    json!({
        "spec": { "replicas": 1, "security": security },
        "status": { "conditions": [{ "type": "WellFormed", "status": "True" }] }
    })
}

pub fn ready_kafka() -> Value {
    json!({
        "status": {
            "conditions": [{ "type": "Ready", "status": "True", "lastTransitionTime": "2024-03-01T08:00:00Z" }],
            "listeners": [{ "name": "plain", "bootstrapServers": "kogito-kafka-kafka-bootstrap.orders.svc:9092" }]
        }
    })
}

pub fn ready_keycloak() -> Value {
    json!({
        "status": { "ready": true, "internalURL": "https://keycloak.orders.svc:8443" }
    })
}

pub fn ready_mongodb() -> Value {
    json!({
        "spec": {
            "users": [{
                "name": "u",
                "db": "admin",
                "passwordSecretRef": { "name": "u-password" }
            }]
        },
        "status": {
            "phase": "Running",
            "mongoUri": "mongodb://kogito-mongodb-0.kogito-mongodb-svc.orders.svc.cluster.local:27017/?replicaSet=kogito-mongodb"
        }
    })
}

pub fn ready_broker() -> Value {
    json!({
        "status": {
            "conditions": [{ "type": "Ready", "status": "True" }],
            "address": { "url": "http://broker-ingress.knative-eventing.svc.cluster.local/orders/default" }
        }
    })
}

pub fn secret(name: &str, data: &[(&str, &[u8])]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(
            data.iter()
                .map(|(key, value)| ((*key).to_string(), ByteString(value.to_vec())))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Secret::default()
    }
}

/// Identities secret the Infinispan operator generates
pub fn identities_secret(instance: &str) -> Secret {
    let yaml = "credentials:\n- username: operator\n  password: op-pass\n- username: developer\n  password: dev-pass\n";
    secret(
        &format!("{instance}-generated-secret"),
        &[("identities.yaml", yaml.as_bytes())],
    )
}

/// PEM certificate block around `der`
pub fn pem(der: &[u8]) -> String {
    let body = base64::engine::general_purpose::STANDARD.encode(der);
    let lines: Vec<&str> = body
        .as_bytes()
        .chunks(64)
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect();
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        lines.join("\n")
    )
}

pub fn tls_secret(name: &str) -> Secret {
    let certificate = pem(&[0x30, 0x03, 0x02, 0x01, 0x07]);
    secret(name, &[("tls.crt", certificate.as_bytes())])
}

pub async fn stored_infra(store: &InMemoryStore, name: &str) -> Infra {
    store.get_infra(NAMESPACE, name).await.unwrap().unwrap()
}

pub async fn stored_secret(store: &InMemoryStore, name: &str) -> Option<Secret> {
    store.get_secret(NAMESPACE, name).await.unwrap()
}

/// Runtime properties published for `flavor` (`quarkus`, `springboot`)
pub fn published(infra: &Infra, flavor: &str) -> RuntimeProperties {
    infra
        .status
        .as_ref()
        .and_then(|status| status.runtime_properties.as_ref())
        .and_then(|props| props.get(flavor))
        .cloned()
        .unwrap_or_else(|| panic!("no runtime properties published for {flavor}"))
}

pub fn secret_value(secret: &Secret, key: &str) -> String {
    let value = secret.data.as_ref().unwrap().get(key).unwrap();
    String::from_utf8(value.0.clone()).unwrap()
}
