//! # Infra Status
//!
//! Status types published by the controller: the single binding condition,
//! runtime properties per application-runtime flavor and the volumes
//! application pods must mount.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status of the Infra resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraStatus {
    /// Outcome of the latest reconciliation
    /// Overwritten on every pass, never appended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<InfraCondition>,
    /// Connection configuration keyed by runtime flavor (`quarkus`, `springboot`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_properties: Option<BTreeMap<String, RuntimeProperties>>,
    /// Secret-backed volumes application pods must mount (e.g. trust stores)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<InfraVolume>,
}

/// Condition type of an Infra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum InfraConditionType {
    Success,
    Failure,
}

/// Classified failure reason carried by a Failure condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum InfraConditionReason {
    /// Generic failure talking to the cluster or persisting state
    ReconciliationFailure,
    /// Declared or default backing instance does not exist
    ResourceNotFound,
    /// The backing type's API is not installed or does not serve the version
    #[serde(rename = "ResourceAPINotFound")]
    ResourceApiNotFound,
    /// The declared kind and apiVersion pair is not supported
    #[serde(rename = "UnsupportedAPIKind")]
    UnsupportedApiKind,
    /// The backing instance exists but is not ready yet
    ResourceNotReady,
    /// Credentials or trust material could not be derived
    ResourceConfigError,
    /// A required infra property is missing
    ResourceMissingResourceConfig,
}

impl InfraConditionReason {
    /// Wire name of the reason, as written to the status
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReconciliationFailure => "ReconciliationFailure",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::ResourceApiNotFound => "ResourceAPINotFound",
            Self::UnsupportedApiKind => "UnsupportedAPIKind",
            Self::ResourceNotReady => "ResourceNotReady",
            Self::ResourceConfigError => "ResourceConfigError",
            Self::ResourceMissingResourceConfig => "ResourceMissingResourceConfig",
        }
    }
}

impl std::fmt::Display for InfraConditionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single condition of an Infra
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraCondition {
    /// Success or Failure
    pub r#type: InfraConditionType,
    /// "True" for Success, "False" for Failure
    pub status: String,
    /// Failure classification; cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<InfraConditionReason>,
    /// Failure message; cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last time the condition changed type (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Connection configuration for one application-runtime flavor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeProperties {
    /// Application properties (`application.properties` keys)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub app_props: BTreeMap<String, String>,
    /// Environment variables, either literal or secret-backed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVarSpec>,
}

/// Environment variable published for application pods
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

/// Source of a secret-backed environment variable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    pub secret_key_ref: SecretKeyRef,
}

/// Key inside a Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

impl EnvVarSpec {
    /// Literal environment variable
    #[must_use]
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        }
    }

    /// Environment variable read from a Secret key
    #[must_use]
    pub fn from_secret(
        name: impl Into<String>,
        secret_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: SecretKeyRef {
                    name: secret_name.into(),
                    key: key.into(),
                },
            }),
        }
    }
}

/// Volume application pods must mount
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraVolume {
    pub mount: VolumeMountSpec,
    pub named_volume: NamedSecretVolume,
}

/// Where a volume is mounted inside the application container
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMountSpec {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// Secret-backed volume
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedSecretVolume {
    pub name: String,
    pub secret: SecretVolumeSource,
}

/// Secret projected into a volume
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretVolumeSource {
    pub secret_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<KeyToPath>,
}

/// Secret key projected to a file path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyToPath {
    pub key: String,
    pub path: String,
}
