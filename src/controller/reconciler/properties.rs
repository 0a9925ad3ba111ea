//! # Property Tables
//!
//! Static maps from abstract connection settings to the literal configuration
//! keys each application-runtime flavor expects.
//!
//! Backing-type reconcilers fill a [`PropertyValues`] once, flavor-neutral.
//! [`synthesize`] then projects it through the table for one flavor:
//!
//! - literal values of application-property entries land in `appProps`
//! - literal values of environment entries become plain env vars
//! - secret-backed values always become `valueFrom.secretKeyRef` env vars
//!
//! Environment variable names are derived from the configuration key by
//! upper-casing it and replacing `.` and `-` with `_`.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::controller::reconciler::dispatch::BackingKind;
use crate::crd::{EnvVarSpec, RuntimeFlavor, RuntimeProperties};

use PropertyKey as K;

/// Abstract connection setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    ServerList,
    UseAuth,
    AuthRealm,
    SaslMechanism,
    Username,
    Password,
    TrustStore,
    TrustStoreType,
    TrustStorePassword,
    BootstrapServers,
    /// Base URL of the identity provider
    AuthServerUrl,
    /// URL of one realm of the identity provider
    RealmUrl,
    Realm,
    ClientId,
    ConnectionString,
    Host,
    Port,
    Database,
    AuthDatabase,
    SinkUrl,
    Connector,
}

/// Where a table entry is published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    AppProp,
    Env,
}

/// One row of a property table
#[derive(Debug, Clone, Copy)]
pub struct PropertyEntry {
    pub key: PropertyKey,
    pub name: &'static str,
    pub target: Target,
    pub mandatory: bool,
}

const fn app(key: PropertyKey, name: &'static str) -> PropertyEntry {
    PropertyEntry {
        key,
        name,
        target: Target::AppProp,
        mandatory: false,
    }
}

const fn env(key: PropertyKey, name: &'static str) -> PropertyEntry {
    PropertyEntry {
        key,
        name,
        target: Target::Env,
        mandatory: false,
    }
}

const fn required(entry: PropertyEntry) -> PropertyEntry {
    PropertyEntry {
        mandatory: true,
        ..entry
    }
}

const INFINISPAN_QUARKUS: &[PropertyEntry] = &[
    required(app(K::ServerList, "quarkus.infinispan-client.server-list")),
    required(app(K::UseAuth, "quarkus.infinispan-client.use-auth")),
    app(K::AuthRealm, "quarkus.infinispan-client.auth-realm"),
    app(K::SaslMechanism, "quarkus.infinispan-client.sasl-mechanism"),
    env(K::Username, "quarkus.infinispan-client.auth-username"),
    env(K::Password, "quarkus.infinispan-client.auth-password"),
    app(K::TrustStore, "quarkus.infinispan-client.trust-store"),
    app(
        K::TrustStoreType,
        "quarkus.infinispan-client.trust-store-type",
    ),
    env(
        K::TrustStorePassword,
        "quarkus.infinispan-client.trust-store-password",
    ),
];

const INFINISPAN_SPRINGBOOT: &[PropertyEntry] = &[
    required(app(K::ServerList, "infinispan.remote.server-list")),
    required(app(K::UseAuth, "infinispan.remote.use-auth")),
    app(K::AuthRealm, "infinispan.remote.auth-realm"),
    app(K::SaslMechanism, "infinispan.remote.sasl-mechanism"),
    env(K::Username, "infinispan.remote.auth-username"),
    env(K::Password, "infinispan.remote.auth-password"),
    app(K::TrustStore, "infinispan.remote.trust-store-file-name"),
    app(K::TrustStoreType, "infinispan.remote.trust-store-type"),
    env(
        K::TrustStorePassword,
        "infinispan.remote.trust-store-password",
    ),
];

const KAFKA_QUARKUS: &[PropertyEntry] = &[
    required(app(K::BootstrapServers, "kafka.bootstrap.servers")),
    env(K::BootstrapServers, "kafka.bootstrap.servers"),
];

const KAFKA_SPRINGBOOT: &[PropertyEntry] = &[
    required(app(K::BootstrapServers, "spring.kafka.bootstrap-servers")),
    env(K::BootstrapServers, "kafka.bootstrap.servers"),
];

const KEYCLOAK_QUARKUS: &[PropertyEntry] = &[
    required(app(K::RealmUrl, "quarkus.oidc.auth-server-url")),
    app(K::ClientId, "quarkus.oidc.client-id"),
];

const KEYCLOAK_SPRINGBOOT: &[PropertyEntry] = &[
    required(app(K::AuthServerUrl, "keycloak.auth-server-url")),
    required(app(K::Realm, "keycloak.realm")),
    app(K::ClientId, "keycloak.resource"),
];

const MONGODB_QUARKUS: &[PropertyEntry] = &[
    required(app(K::ConnectionString, "quarkus.mongodb.connection-string")),
    required(app(K::Database, "quarkus.mongodb.database")),
    app(K::AuthDatabase, "quarkus.mongodb.credentials.auth-source"),
    env(K::Username, "quarkus.mongodb.credentials.username"),
    env(K::Password, "quarkus.mongodb.credentials.password"),
];

const MONGODB_SPRINGBOOT: &[PropertyEntry] = &[
    required(app(K::Host, "spring.data.mongodb.host")),
    required(app(K::Port, "spring.data.mongodb.port")),
    required(app(K::Database, "spring.data.mongodb.database")),
    app(
        K::AuthDatabase,
        "spring.data.mongodb.authentication-database",
    ),
    env(K::Username, "spring.data.mongodb.username"),
    env(K::Password, "spring.data.mongodb.password"),
];

const BROKER_QUARKUS: &[PropertyEntry] = &[
    required(app(
        K::SinkUrl,
        "mp.messaging.outgoing.kogito_outgoing_stream.url",
    )),
    required(app(
        K::Connector,
        "mp.messaging.outgoing.kogito_outgoing_stream.connector",
    )),
    env(K::SinkUrl, "k-sink"),
];

const BROKER_SPRINGBOOT: &[PropertyEntry] = &[
    required(app(K::SinkUrl, "kogito.addon.cloudevents.knative.sink-url")),
    env(K::SinkUrl, "k-sink"),
];

/// Property table for a backing type and runtime flavor
#[must_use]
pub fn table(kind: BackingKind, flavor: RuntimeFlavor) -> &'static [PropertyEntry] {
    match (kind, flavor) {
        (BackingKind::Infinispan, RuntimeFlavor::Quarkus) => INFINISPAN_QUARKUS,
        (BackingKind::Infinispan, RuntimeFlavor::SpringBoot) => INFINISPAN_SPRINGBOOT,
        (BackingKind::Kafka, RuntimeFlavor::Quarkus) => KAFKA_QUARKUS,
        (BackingKind::Kafka, RuntimeFlavor::SpringBoot) => KAFKA_SPRINGBOOT,
        (BackingKind::Keycloak, RuntimeFlavor::Quarkus) => KEYCLOAK_QUARKUS,
        (BackingKind::Keycloak, RuntimeFlavor::SpringBoot) => KEYCLOAK_SPRINGBOOT,
        (BackingKind::MongoDb, RuntimeFlavor::Quarkus) => MONGODB_QUARKUS,
        (BackingKind::MongoDb, RuntimeFlavor::SpringBoot) => MONGODB_SPRINGBOOT,
        (BackingKind::Broker, RuntimeFlavor::Quarkus) => BROKER_QUARKUS,
        (BackingKind::Broker, RuntimeFlavor::SpringBoot) => BROKER_SPRINGBOOT,
    }
}

/// Derive the environment variable name for a configuration key
#[must_use]
pub fn env_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Value of one connection setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Literal(String),
    SecretRef { secret_name: String, key: String },
}

/// Flavor-neutral connection settings produced by a backing-type reconciler
#[derive(Debug, Clone, Default)]
pub struct PropertyValues {
    values: BTreeMap<PropertyKey, PropertyValue>,
}

impl PropertyValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(&mut self, key: PropertyKey, value: impl Into<String>) -> &mut Self {
        self.values.insert(key, PropertyValue::Literal(value.into()));
        self
    }

    pub fn secret(
        &mut self,
        key: PropertyKey,
        secret_name: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> &mut Self {
        self.values.insert(
            key,
            PropertyValue::SecretRef {
                secret_name: secret_name.into(),
                key: secret_key.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn get(&self, key: PropertyKey) -> Option<&PropertyValue> {
        self.values.get(&key)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("mandatory property {property} has no value for runtime {flavor}")]
pub struct MissingProperty {
    pub flavor: RuntimeFlavor,
    pub property: &'static str,
}

/// Project connection settings through the table of one flavor
///
/// Settings the table does not list are ignored.
///
/// # Errors
///
/// [`MissingProperty`] when a mandatory entry of the table has no value
pub fn synthesize(
    kind: BackingKind,
    flavor: RuntimeFlavor,
    values: &PropertyValues,
) -> Result<RuntimeProperties, MissingProperty> {
    let mut props = RuntimeProperties::default();
    for entry in table(kind, flavor) {
        let Some(value) = values.get(entry.key) else {
            if entry.mandatory {
                return Err(MissingProperty {
                    flavor,
                    property: entry.name,
                });
            }
            continue;
        };
        match (entry.target, value) {
            (Target::AppProp, PropertyValue::Literal(literal)) => {
                props
                    .app_props
                    .insert(entry.name.to_string(), literal.clone());
            }
            (Target::Env, PropertyValue::Literal(literal)) => {
                props
                    .env
                    .push(EnvVarSpec::literal(env_name(entry.name), literal.clone()));
            }
            (_, PropertyValue::SecretRef { secret_name, key }) => {
                props.env.push(EnvVarSpec::from_secret(
                    env_name(entry.name),
                    secret_name.clone(),
                    key.clone(),
                ));
            }
        }
    }
    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A value for every key any table can ask for
    fn every_value() -> PropertyValues {
        let mut values = PropertyValues::new();
        values
            .literal(K::ServerList, "cache.ns.svc:11222")
            .literal(K::UseAuth, "true")
            .literal(K::AuthRealm, "default")
            .literal(K::SaslMechanism, "DIGEST-MD5")
            .secret(K::Username, "creds", "username")
            .secret(K::Password, "creds", "password")
            .literal(K::TrustStore, "/certs/truststore.p12")
            .literal(K::TrustStoreType, "PKCS12")
            .secret(K::TrustStorePassword, "trust", "truststore-password")
            .literal(K::BootstrapServers, "kafka:9092")
            .literal(K::AuthServerUrl, "https://kc/auth")
            .literal(K::RealmUrl, "https://kc/auth/realms/kogito")
            .literal(K::Realm, "kogito")
            .literal(K::ClientId, "app")
            .literal(K::ConnectionString, "mongodb://db:27017")
            .literal(K::Host, "db")
            .literal(K::Port, "27017")
            .literal(K::Database, "orders")
            .literal(K::AuthDatabase, "admin")
            .literal(K::SinkUrl, "http://broker")
            .literal(K::Connector, "quarkus-http");
        values
    }

    #[test]
    fn test_every_table_is_satisfied_by_complete_values() {
        let values = every_value();
        for kind in BackingKind::ALL {
            for flavor in RuntimeFlavor::ALL {
                let props = synthesize(kind, flavor, &values).unwrap();
                for entry in table(kind, flavor).iter().filter(|e| e.mandatory) {
                    assert!(
                        props.app_props.contains_key(entry.name),
                        "{kind}/{flavor} is missing {}",
                        entry.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_table_has_a_mandatory_entry() {
        for kind in BackingKind::ALL {
            for flavor in RuntimeFlavor::ALL {
                assert!(table(kind, flavor).iter().any(|e| e.mandatory));
            }
        }
    }

    #[test]
    fn test_missing_mandatory_value_is_reported() {
        let mut values = PropertyValues::new();
        values.literal(K::Host, "db");
        let err = synthesize(BackingKind::MongoDb, RuntimeFlavor::SpringBoot, &values).unwrap_err();
        assert_eq!(err.property, "spring.data.mongodb.port");
    }

    #[test]
    fn test_env_name_derivation() {
        assert_eq!(
            env_name("quarkus.infinispan-client.auth-username"),
            "QUARKUS_INFINISPAN_CLIENT_AUTH_USERNAME"
        );
        assert_eq!(
            env_name("kafka.bootstrap.servers"),
            "KAFKA_BOOTSTRAP_SERVERS"
        );
        assert_eq!(env_name("k-sink"), "K_SINK");
    }

    #[test]
    fn test_secret_values_become_env_refs() {
        let values = every_value();
        let props =
            synthesize(BackingKind::Infinispan, RuntimeFlavor::SpringBoot, &values).unwrap();
        let username = props
            .env
            .iter()
            .find(|e| e.name == "INFINISPAN_REMOTE_AUTH_USERNAME")
            .unwrap();
        let source = username.value_from.as_ref().unwrap();
        assert_eq!(source.secret_key_ref.name, "creds");
        assert_eq!(source.secret_key_ref.key, "username");
        assert!(username.value.is_none());
        assert!(!props.app_props.contains_key("infinispan.remote.auth-username"));
    }

    #[test]
    fn test_kafka_publishes_bootstrap_env_for_both_flavors() {
        for flavor in RuntimeFlavor::ALL {
            let props = synthesize(BackingKind::Kafka, flavor, &every_value()).unwrap();
            assert_eq!(props.env.len(), 1);
            assert_eq!(props.env[0].name, "KAFKA_BOOTSTRAP_SERVERS");
            assert_eq!(props.env[0].value.as_deref(), Some("kafka:9092"));
        }
    }
}
