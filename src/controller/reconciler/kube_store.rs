//! # Kubernetes Object Store
//!
//! [`ObjectStore`] backed by a live `kube::Client`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{ApiResource, DynamicObject, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::store::{ObjectStore, StoreError};
use crate::crd::Infra;

/// Production store talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        }
    }
}

/// Map write errors to the store's race classification
fn classify_write_error(err: kube::Error, kind: &str, namespace: &str, name: &str) -> StoreError {
    match err {
        kube::Error::Api(api_err) if api_err.code == 409 => {
            if api_err.reason == "AlreadyExists" {
                StoreError::AlreadyExists {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            } else {
                StoreError::Conflict {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            }
        }
        other => StoreError::Api(other),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn api_available(&self, resource: &ApiResource) -> Result<bool, StoreError> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let crd_name = format!("{}.{}", resource.plural, resource.group);
        let Some(crd) = crds.get_opt(&crd_name).await? else {
            return Ok(false);
        };
        Ok(crd
            .spec
            .versions
            .iter()
            .any(|version| version.name == resource.version && version.served))
    }

    async fn get_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, StoreError> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        Ok(api.get_opt(name).await?)
    }

    async fn create_dynamic(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        api.create(&Self::post_params(), object)
            .await
            .map_err(|e| classify_write_error(e, &resource.kind, namespace, &object.name_any()))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.create(&Self::post_params(), secret)
            .await
            .map_err(|e| classify_write_error(e, "Secret", namespace, &secret.name_any()))
    }

    async fn get_infra(&self, namespace: &str, name: &str) -> Result<Option<Infra>, StoreError> {
        let api: Api<Infra> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_infra_status(&self, infra: &Infra) -> Result<Infra, StoreError> {
        let namespace = infra.namespace().unwrap_or_default();
        let name = infra.name_any();
        let api: Api<Infra> = Api::namespaced(self.client.clone(), &namespace);

        // Server-side apply of the whole status; the resourceVersion turns a
        // stale write into a 409 instead of silently overwriting newer state
        let body = serde_json::json!({
            "apiVersion": "infra.processruntime.io/v1beta1",
            "kind": "Infra",
            "metadata": {
                "name": name,
                "resourceVersion": infra.resource_version(),
            },
            "status": infra.status,
        });

        api.patch_status(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&body),
        )
        .await
        .map_err(|e| classify_write_error(e, "Infra", &namespace, &name))
    }
}
