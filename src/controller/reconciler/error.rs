//! # Binding Errors
//!
//! Classified errors raised while binding an Infra to its backing instance.
//! Every variant maps to exactly one condition reason written on the status.

use thiserror::Error;

use crate::controller::reconciler::store::StoreError;
use crate::crd::InfraConditionReason;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(
        "API {api_version} for kind {kind} is not available in the cluster, install the operator that provides it"
    )]
    ApiNotFound { kind: String, api_version: String },

    #[error("{kind} resource {name} not found in namespace {namespace}")]
    ResourceNotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("unsupported API kind {kind} in {api_version}")]
    UnsupportedApiKind { kind: String, api_version: String },

    #[error("{kind} resource {name} in namespace {namespace} is not ready: {detail}")]
    NotReady {
        kind: String,
        name: String,
        namespace: String,
        detail: String,
    },

    #[error("failed to derive configuration from {kind} resource {name}: {detail}")]
    Config {
        kind: String,
        name: String,
        detail: String,
    },

    #[error("required infra property {property} is missing for kind {kind}")]
    MissingResourceConfig { kind: String, property: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InfraError {
    /// Condition reason recorded for this error
    #[must_use]
    pub fn reason(&self) -> InfraConditionReason {
        match self {
            Self::ApiNotFound { .. } => InfraConditionReason::ResourceApiNotFound,
            Self::ResourceNotFound { .. } => InfraConditionReason::ResourceNotFound,
            Self::UnsupportedApiKind { .. } => InfraConditionReason::UnsupportedApiKind,
            Self::NotReady { .. } => InfraConditionReason::ResourceNotReady,
            Self::Config { .. } => InfraConditionReason::ResourceConfigError,
            Self::MissingResourceConfig { .. } => {
                InfraConditionReason::ResourceMissingResourceConfig
            }
            Self::Store(_) => InfraConditionReason::ReconciliationFailure,
        }
    }

    pub(crate) fn config(kind: &str, name: &str, detail: impl Into<String>) -> Self {
        Self::Config {
            kind: kind.to_string(),
            name: name.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn not_ready(
        kind: &str,
        name: &str,
        namespace: &str,
        detail: impl Into<String>,
    ) -> Self {
        Self::NotReady {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            detail: detail.into(),
        }
    }
}
