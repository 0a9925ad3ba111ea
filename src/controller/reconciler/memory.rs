//! # In-Memory Object Store
//!
//! [`ObjectStore`] kept entirely in process memory.
//!
//! Used by unit and integration tests to drive whole reconciliation passes
//! without a cluster. It mimics the API server behaviour the engine depends
//! on: uid and resourceVersion assignment, `AlreadyExists` on duplicate
//! creates and `Conflict` on stale status writes. Every call yields to the
//! scheduler first so concurrently running passes interleave.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DynamicObject};
use kube::ResourceExt;

use crate::controller::reconciler::store::{ObjectStore, StoreError};
use crate::crd::Infra;

type ObjectKey = (String, String, String);

#[derive(Debug, Default)]
struct State {
    apis: HashSet<(String, String)>,
    dynamic: HashMap<ObjectKey, DynamicObject>,
    secrets: HashMap<(String, String), Secret>,
    infras: HashMap<(String, String), Infra>,
    next_version: u64,
    injected_status_conflicts: u32,
    secret_creates: u32,
    dynamic_creates: u32,
}

impl State {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// Object store held in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

fn api_key(resource: &ApiResource) -> (String, String) {
    (
        format!("{}.{}", resource.plural, resource.group),
        resource.version.clone(),
    )
}

fn dynamic_key(resource: &ApiResource, namespace: &str, name: &str) -> ObjectKey {
    (
        format!("{}/{}", resource.api_version, resource.kind),
        namespace.to_string(),
        name.to_string(),
    )
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the CRD behind `resource` as installed and serving its version
    pub fn install_api(&self, resource: &ApiResource) {
        self.state().apis.insert(api_key(resource));
    }

    /// Insert or overwrite a backing instance, as its own operator would
    pub fn put_dynamic(&self, resource: &ApiResource, namespace: &str, mut object: DynamicObject) {
        let mut state = self.state();
        let version = state.bump_version();
        object.metadata.namespace = Some(namespace.to_string());
        object.metadata.resource_version = Some(version);
        if object.metadata.uid.is_none() {
            object.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        let key = dynamic_key(resource, namespace, &object.name_any());
        state.dynamic.insert(key, object);
    }

    /// Insert or overwrite a Secret
    pub fn put_secret(&self, namespace: &str, mut secret: Secret) {
        let mut state = self.state();
        let version = state.bump_version();
        secret.metadata.namespace = Some(namespace.to_string());
        secret.metadata.resource_version = Some(version);
        let key = (namespace.to_string(), secret.name_any());
        state.secrets.insert(key, secret);
    }

    /// Insert or overwrite an Infra, assigning a uid when it has none
    pub fn put_infra(&self, namespace: &str, mut infra: Infra) {
        let mut state = self.state();
        let version = state.bump_version();
        infra.metadata.namespace = Some(namespace.to_string());
        infra.metadata.resource_version = Some(version);
        if infra.metadata.uid.is_none() {
            infra.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        let key = (namespace.to_string(), infra.name_any());
        state.infras.insert(key, infra);
    }

    /// Make the next `count` status writes fail with `Conflict`
    pub fn inject_status_conflicts(&self, count: u32) {
        self.state().injected_status_conflicts = count;
    }

    /// Number of Secrets created through [`ObjectStore::create_secret`]
    #[must_use]
    pub fn secret_creates(&self) -> u32 {
        self.state().secret_creates
    }

    /// Number of backing instances created through [`ObjectStore::create_dynamic`]
    #[must_use]
    pub fn dynamic_creates(&self) -> u32 {
        self.state().dynamic_creates
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn api_available(&self, resource: &ApiResource) -> Result<bool, StoreError> {
        tokio::task::yield_now().await;
        Ok(self.state().apis.contains(&api_key(resource)))
    }

    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, StoreError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .dynamic
            .get(&dynamic_key(resource, namespace, name))
            .cloned())
    }

    async fn create_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let name = object.name_any();
        let key = dynamic_key(resource, namespace, &name);
        if state.dynamic.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: resource.kind.clone(),
                namespace: namespace.to_string(),
                name,
            });
        }
        let mut created = object.clone();
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        created.metadata.resource_version = Some(state.bump_version());
        state.dynamic_creates += 1;
        state.dynamic.insert(key, created.clone());
        Ok(created)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let name = secret.name_any();
        let key = (namespace.to_string(), name.clone());
        if state.secrets.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: "Secret".to_string(),
                namespace: namespace.to_string(),
                name,
            });
        }
        let mut created = secret.clone();
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        created.metadata.resource_version = Some(state.bump_version());
        state.secret_creates += 1;
        state.secrets.insert(key, created.clone());
        Ok(created)
    }

    async fn get_infra(&self, namespace: &str, name: &str) -> Result<Option<Infra>, StoreError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .infras
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn replace_infra_status(&self, infra: &Infra) -> Result<Infra, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let namespace = infra.namespace().unwrap_or_default();
        let name = infra.name_any();
        let conflict = || StoreError::Conflict {
            kind: "Infra".to_string(),
            namespace: namespace.clone(),
            name: name.clone(),
        };

        if state.injected_status_conflicts > 0 {
            state.injected_status_conflicts -= 1;
            return Err(conflict());
        }

        // A deleted Infra surfaces as a conflict so callers re-read and notice it is gone
        let key = (namespace.clone(), name.clone());
        match state.infras.get(&key).map(ResourceExt::resource_version) {
            Some(current) if current == infra.resource_version() => {}
            _ => return Err(conflict()),
        }

        let version = state.bump_version();
        let Some(stored) = state.infras.get_mut(&key) else {
            return Err(conflict());
        };
        stored.status.clone_from(&infra.status);
        stored.metadata.resource_version = Some(version);
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::InfraSpec;

    #[tokio::test]
    async fn test_stale_status_write_conflicts() {
        let store = InMemoryStore::new();
        store.put_infra("ns", Infra::new("infra", InfraSpec::default()));

        let first = store.get_infra("ns", "infra").await.unwrap().unwrap();
        let stale = first.clone();
        store.replace_infra_status(&first).await.unwrap();

        let err = store.replace_infra_status(&stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_secret_create_already_exists() {
        let store = InMemoryStore::new();
        let mut secret = Secret::default();
        secret.metadata.name = Some("creds".into());

        store.create_secret("ns", &secret).await.unwrap();
        let err = store.create_secret("ns", &secret).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.secret_creates(), 1);
    }
}
