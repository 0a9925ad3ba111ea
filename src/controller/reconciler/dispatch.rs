//! # Resource-Class Dispatcher
//!
//! Maps the `(kind, apiVersion)` declared on an Infra to the backing type
//! that knows how to bind it.

use std::collections::HashMap;
use std::sync::LazyLock;

use kube::api::ApiResource;
use kube::core::GroupVersionKind;

use crate::controller::reconciler::error::InfraError;

/// Supported backing types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackingKind {
    /// Infinispan cache cluster
    Infinispan,
    /// Strimzi Kafka cluster
    Kafka,
    /// Keycloak identity provider
    Keycloak,
    /// MongoDB Community document store
    MongoDb,
    /// Knative Eventing broker
    Broker,
}

/// Lookup table keyed by `lower(kind) + lower(apiVersion)`, built once
static DISPATCH: LazyLock<HashMap<String, BackingKind>> = LazyLock::new(|| {
    BackingKind::ALL
        .into_iter()
        .map(|kind| (dispatch_key(kind.kind(), &kind.api_version()), kind))
        .collect()
});

fn dispatch_key(kind: &str, api_version: &str) -> String {
    format!(
        "{}{}",
        kind.trim().to_lowercase(),
        api_version.trim().to_lowercase()
    )
}

impl BackingKind {
    pub const ALL: [Self; 5] = [
        Self::Infinispan,
        Self::Kafka,
        Self::Keycloak,
        Self::MongoDb,
        Self::Broker,
    ];

    /// Resolve a declared kind and apiVersion
    ///
    /// # Errors
    ///
    /// `UnsupportedApiKind` when the pair is not one of the supported backing types
    pub fn resolve(kind: &str, api_version: &str) -> Result<Self, InfraError> {
        DISPATCH
            .get(&dispatch_key(kind, api_version))
            .copied()
            .ok_or_else(|| InfraError::UnsupportedApiKind {
                kind: kind.to_string(),
                api_version: api_version.to_string(),
            })
    }

    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Infinispan => "Infinispan",
            Self::Kafka => "Kafka",
            Self::Keycloak => "Keycloak",
            Self::MongoDb => "MongoDBCommunity",
            Self::Broker => "Broker",
        }
    }

    #[must_use]
    pub fn group(self) -> &'static str {
        match self {
            Self::Infinispan => "infinispan.org",
            Self::Kafka => "kafka.strimzi.io",
            Self::Keycloak => "keycloak.org",
            Self::MongoDb => "mongodbcommunity.mongodb.com",
            Self::Broker => "eventing.knative.dev",
        }
    }

    #[must_use]
    pub fn version(self) -> &'static str {
        match self {
            Self::Infinispan | Self::MongoDb | Self::Broker => "v1",
            Self::Kafka => "v1beta2",
            Self::Keycloak => "v1alpha1",
        }
    }

    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Infinispan => "infinispans",
            Self::Kafka => "kafkas",
            Self::Keycloak => "keycloaks",
            Self::MongoDb => "mongodbcommunity",
            Self::Broker => "brokers",
        }
    }

    #[must_use]
    pub fn api_version(self) -> String {
        format!("{}/{}", self.group(), self.version())
    }

    /// API resource used for dynamic access to instances of this kind
    #[must_use]
    pub fn api_resource(self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group(), self.version(), self.kind());
        ApiResource::from_gvk_with_plural(&gvk, self.plural())
    }

    /// Name of the instance used when an Infra does not name one
    #[must_use]
    pub fn default_instance_name(self) -> &'static str {
        match self {
            Self::Infinispan => "kogito-infinispan",
            Self::Kafka => "kogito-kafka",
            Self::Keycloak => "kogito-keycloak",
            Self::MongoDb => "kogito-mongodb",
            Self::Broker => "default",
        }
    }

    /// Label value used in metrics
    #[must_use]
    pub fn metric_label(self) -> &'static str {
        match self {
            Self::Infinispan => "infinispan",
            Self::Kafka => "kafka",
            Self::Keycloak => "keycloak",
            Self::MongoDb => "mongodb",
            Self::Broker => "broker",
        }
    }
}

impl std::fmt::Display for BackingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::InfraConditionReason;

    #[test]
    fn test_resolve_every_supported_kind() {
        for kind in BackingKind::ALL {
            let resolved = BackingKind::resolve(kind.kind(), &kind.api_version()).unwrap();
            assert_eq!(resolved, kind);
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(
            BackingKind::resolve("mongodbcommunity", "MongoDBCommunity.MongoDB.com/v1").unwrap(),
            BackingKind::MongoDb
        );
        assert_eq!(
            BackingKind::resolve("KAFKA", "kafka.strimzi.io/v1beta2").unwrap(),
            BackingKind::Kafka
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_and_wrong_version() {
        let err = BackingKind::resolve("Redis", "redis.io/v1").unwrap_err();
        assert_eq!(err.reason(), InfraConditionReason::UnsupportedApiKind);

        // Known kind, unsupported version
        let err = BackingKind::resolve("Kafka", "kafka.strimzi.io/v1beta1").unwrap_err();
        assert_eq!(err.reason(), InfraConditionReason::UnsupportedApiKind);
    }

    #[test]
    fn test_api_resource_uses_plural() {
        let ar = BackingKind::MongoDb.api_resource();
        assert_eq!(ar.plural, "mongodbcommunity");
        assert_eq!(ar.api_version, "mongodbcommunity.mongodb.com/v1");
        assert_eq!(ar.kind, "MongoDBCommunity");
    }
}
