//! # Object Store
//!
//! Abstraction over the cluster state the binding engine reads and writes.
//!
//! Reconcilers never talk to the Kubernetes API directly. They go through
//! [`ObjectStore`], which production code backs with a `kube::Client`
//! ([`crate::controller::reconciler::kube_store::KubeStore`]) and tests back
//! with [`crate::controller::reconciler::memory::InMemoryStore`].
//!
//! Every write is wrapped in [`retry_on_conflict`]: a write that loses a race
//! (`Conflict` on a stale resourceVersion, `AlreadyExists` on a concurrent
//! create) is re-run from a fresh read.

use std::future::Future;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DynamicObject};
use thiserror::Error;
use tracing::debug;

use crate::crd::Infra;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} was modified concurrently")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read/write access to the objects the binding engine works with
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the CRD behind `resource` is installed and serves its version
    async fn api_available(&self, resource: &ApiResource) -> Result<bool, StoreError>;

    /// Get a backing instance, `None` when it does not exist
    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, StoreError>;

    /// Create a backing instance, failing with `AlreadyExists` if the name is taken
    async fn create_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, StoreError>;

    async fn get_infra(&self, namespace: &str, name: &str) -> Result<Option<Infra>, StoreError>;

    /// Replace the status of `infra`
    /// Fails with `Conflict` if `infra` carries a stale resourceVersion
    async fn replace_infra_status(&self, infra: &Infra) -> Result<Infra, StoreError>;
}

/// Errors that signal a lost write race worth retrying
pub trait IsConflict {
    fn is_conflict(&self) -> bool;
}

impl IsConflict for StoreError {
    fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::Conflict { .. })
    }
}

/// Run `op` until it succeeds, fails with a non-conflict error, or
/// `max_attempts` is exhausted
///
/// `op` receives the 1-based attempt number and must re-read whatever it
/// writes, so each retry works from the latest state.
pub async fn retry_on_conflict<T, E, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, E>
where
    E: IsConflict + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Err(err) if err.is_conflict() && attempt < max_attempts => {
                debug!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "write lost a race, retrying from a fresh read"
                );
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conflict() -> StoreError {
        StoreError::Conflict {
            kind: "Infra".into(),
            namespace: "ns".into(),
            name: "infra".into(),
        }
    }

    #[tokio::test]
    async fn test_retry_on_conflict_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_on_conflict(5, |attempt| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(conflict())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_on_conflict_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = retry_on_conflict(2, |_| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_on_conflict_does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = retry_on_conflict(5, |_| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Serialization(
                    serde_json::from_str::<u32>("nope").unwrap_err(),
                ))
            }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_already_exists_counts_as_conflict() {
        let err = StoreError::AlreadyExists {
            kind: "Secret".into(),
            namespace: "ns".into(),
            name: "s".into(),
        };
        assert!(err.is_conflict());
    }
}
