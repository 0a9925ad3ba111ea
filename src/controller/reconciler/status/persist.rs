//! # Status Persistence
//!
//! Writes a computed status back to the cluster.

use kube::ResourceExt;
use tracing::debug;

use crate::controller::reconciler::store::{retry_on_conflict, ObjectStore, StoreError};
use crate::crd::Infra;

/// Persist the status of `computed`
///
/// Each attempt re-reads the latest Infra and applies the computed status on
/// top of it, so a conflicting write by someone else costs one retry rather
/// than the whole pass. Unchanged statuses are not written. Returns `None`
/// when the Infra no longer exists.
///
/// # Errors
///
/// Store errors, including conflicts that persist past `max_attempts`
pub async fn persist(
    store: &dyn ObjectStore,
    computed: &Infra,
    max_attempts: u32,
) -> Result<Option<Infra>, StoreError> {
    let namespace = computed.namespace().unwrap_or_default();
    let name = computed.name_any();

    retry_on_conflict(max_attempts, |_| {
        let (namespace, name) = (namespace.as_str(), name.as_str());
        async move {
            let Some(mut latest) = store.get_infra(namespace, name).await? else {
                debug!(
                    resource.name = %name,
                    resource.namespace = %namespace,
                    "infra deleted, skipping status write"
                );
                return Ok(None);
            };
            if latest.status == computed.status {
                debug!(
                    resource.name = %name,
                    resource.namespace = %namespace,
                    "status unchanged, skipping write"
                );
                return Ok(Some(latest));
            }
            latest.status.clone_from(&computed.status);
            store.replace_infra_status(&latest).await.map(Some)
        }
    })
    .await
}
