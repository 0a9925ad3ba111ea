//! # Infinispan
//!
//! Binds Infra resources to Infinispan cache clusters.
//!
//! Authentication uses the identities the Infinispan operator generates for the
//! cluster. When the cluster encrypts its endpoint, the certificate it serves is
//! packed into a PKCS#12 trust store mounted into application pods.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use kube::api::DynamicObject;
use kube::ResourceExt;
use serde::Deserialize;
use serde_json::Value;
use zeroize::Zeroizing;

use super::{bool_field, condition_ready, str_field, BindingOutput};
use crate::constants::{
    CERTS_MOUNT_DIR, CREDENTIAL_PASSWORD_KEY, CREDENTIAL_USERNAME_KEY, TRUSTSTORE_KEY,
    TRUSTSTORE_PASSWORD_KEY, TRUSTSTORE_TYPE,
};
use crate::controller::reconciler::context::ClusterContext;
use crate::controller::reconciler::credentials::{
    derive_trust_store, load_or_create_credential_secret, load_or_create_secret, secret_string,
    Credentials,
};
use crate::controller::reconciler::dispatch::BackingKind;
use crate::controller::reconciler::error::InfraError;
use crate::controller::reconciler::properties::{PropertyKey, PropertyValues};
use crate::crd::{InfraVolume, KeyToPath, NamedSecretVolume, SecretVolumeSource, VolumeMountSpec};

const KIND: &str = "Infinispan";
const HOTROD_PORT: u16 = 11222;
const CREDENTIAL_SECRET: &str = "kogito-infinispan-credential";
const TRUSTSTORE_SECRET: &str = "kogito-infinispan-truststore";
const TRUSTSTORE_VOLUME: &str = "infinispan-truststore";
const IDENTITIES_KEY: &str = "identities.yaml";
const PREFERRED_USER: &str = "developer";
const DEFAULT_REALM: &str = "default";
const SASL_TLS: &str = "PLAIN";
const SASL_PLAIN_TEXT: &str = "DIGEST-MD5";

pub(super) fn default_spec() -> Value {
    serde_json::json!({ "replicas": 1 })
}

pub(super) fn readiness(instance: &DynamicObject) -> Result<(), String> {
    condition_ready(instance, "WellFormed")
}

/// Path of the trust store inside application pods
fn truststore_mount_path() -> String {
    format!("{CERTS_MOUNT_DIR}/infinispan/{TRUSTSTORE_KEY}")
}

pub(super) async fn configure(
    ctx: &ClusterContext<'_>,
    instance: &DynamicObject,
) -> Result<BindingOutput, InfraError> {
    let name = instance.name_any();
    let namespace = instance
        .namespace()
        .unwrap_or_else(|| ctx.namespace.clone());

    let mut output = BindingOutput::default();
    let values: &mut PropertyValues = &mut output.values;
    values.literal(
        PropertyKey::ServerList,
        format!("{name}.{namespace}.svc:{HOTROD_PORT}"),
    );

    let use_auth = bool_field(instance, "/spec/security/endpointAuthentication").unwrap_or(true);
    values.literal(PropertyKey::UseAuth, use_auth.to_string());

    let cert_secret = tls_secret_name(instance);

    if use_auth {
        let identities_secret = str_field(instance, "/spec/security/endpointSecretName")
            .map_or_else(|| format!("{name}-generated-secret"), str::to_string);

        load_or_create_credential_secret(ctx, CREDENTIAL_SECRET, BackingKind::Infinispan, || {
            derive_credentials(ctx, &namespace, &name, &identities_secret)
        })
        .await?;

        values
            .literal(
                PropertyKey::AuthRealm,
                ctx.infra_property("realm").unwrap_or(DEFAULT_REALM),
            )
            .literal(
                PropertyKey::SaslMechanism,
                if cert_secret.is_some() {
                    SASL_TLS
                } else {
                    SASL_PLAIN_TEXT
                },
            )
            .secret(
                PropertyKey::Username,
                CREDENTIAL_SECRET,
                CREDENTIAL_USERNAME_KEY,
            )
            .secret(
                PropertyKey::Password,
                CREDENTIAL_SECRET,
                CREDENTIAL_PASSWORD_KEY,
            );
    }

    if let Some(cert_secret) = cert_secret {
        load_or_create_secret(ctx, TRUSTSTORE_SECRET, BackingKind::Infinispan, || {
            derive_trust_store_data(ctx, &namespace, &name, &cert_secret)
        })
        .await?;

        values
            .literal(PropertyKey::TrustStore, truststore_mount_path())
            .literal(PropertyKey::TrustStoreType, TRUSTSTORE_TYPE)
            .secret(
                PropertyKey::TrustStorePassword,
                TRUSTSTORE_SECRET,
                TRUSTSTORE_PASSWORD_KEY,
            );
        output.volumes.push(truststore_volume());
    }

    Ok(output)
}

/// Secret holding the endpoint certificate, `None` when encryption is off
fn tls_secret_name(instance: &DynamicObject) -> Option<String> {
    let encryption = str_field(instance, "/spec/security/endpointEncryption/type");
    if encryption.is_some_and(|kind| kind.eq_ignore_ascii_case("none")) {
        return None;
    }
    str_field(instance, "/spec/security/endpointEncryption/certSecretName").map(str::to_string)
}

#[derive(Deserialize)]
struct Identities {
    #[serde(default)]
    credentials: Vec<Identity>,
}

#[derive(Deserialize)]
struct Identity {
    username: String,
    password: String,
}

/// Pick the identity applications connect with
///
/// The `developer` user is preferred, otherwise the first listed identity.
fn select_credentials(identities_yaml: &str) -> Result<Credentials, String> {
    let identities: Identities = serde_yaml::from_str(identities_yaml)
        .map_err(|e| format!("{IDENTITIES_KEY} is not valid YAML: {e}"))?;
    let mut credentials = identities.credentials;
    let index = credentials
        .iter()
        .position(|identity| identity.username == PREFERRED_USER)
        .unwrap_or(0);
    if credentials.is_empty() {
        return Err(format!("{IDENTITIES_KEY} lists no credentials"));
    }
    let identity = credentials.swap_remove(index);
    Ok(Credentials {
        username: identity.username,
        password: Zeroizing::new(identity.password),
    })
}

async fn derive_credentials(
    ctx: &ClusterContext<'_>,
    namespace: &str,
    instance_name: &str,
    identities_secret: &str,
) -> Result<Credentials, InfraError> {
    let secret = ctx
        .store
        .get_secret(namespace, identities_secret)
        .await?
        .ok_or_else(|| {
            InfraError::config(
                KIND,
                instance_name,
                format!("identities secret {identities_secret} not found in namespace {namespace}"),
            )
        })?;
    let identities = secret_string(&secret, IDENTITIES_KEY)
        .map(Zeroizing::new)
        .ok_or_else(|| {
            InfraError::config(
                KIND,
                instance_name,
                format!("secret {identities_secret} has no {IDENTITIES_KEY} key"),
            )
        })?;
    select_credentials(&identities)
        .map_err(|detail| InfraError::config(KIND, instance_name, detail))
}

async fn derive_trust_store_data(
    ctx: &ClusterContext<'_>,
    namespace: &str,
    instance_name: &str,
    cert_secret: &str,
) -> Result<BTreeMap<String, ByteString>, InfraError> {
    let secret = ctx
        .store
        .get_secret(namespace, cert_secret)
        .await?
        .ok_or_else(|| {
            InfraError::config(
                KIND,
                instance_name,
                format!("certificate secret {cert_secret} not found in namespace {namespace}"),
            )
        })?;
    let data = secret.data.unwrap_or_default();
    let password = Zeroizing::new(uuid::Uuid::new_v4().to_string());
    let truststore = derive_trust_store(&data, &password).map_err(|err| {
        InfraError::config(KIND, instance_name, format!("secret {cert_secret}: {err}"))
    })?;
    Ok(BTreeMap::from([
        (TRUSTSTORE_KEY.to_string(), ByteString(truststore)),
        (
            TRUSTSTORE_PASSWORD_KEY.to_string(),
            ByteString(password.as_bytes().to_vec()),
        ),
    ]))
}

fn truststore_volume() -> InfraVolume {
    InfraVolume {
        mount: VolumeMountSpec {
            name: TRUSTSTORE_VOLUME.to_string(),
            mount_path: truststore_mount_path(),
            read_only: true,
            sub_path: Some(TRUSTSTORE_KEY.to_string()),
        },
        named_volume: NamedSecretVolume {
            name: TRUSTSTORE_VOLUME.to_string(),
            secret: SecretVolumeSource {
                secret_name: TRUSTSTORE_SECRET.to_string(),
                items: vec![KeyToPath {
                    key: TRUSTSTORE_KEY.to_string(),
                    path: TRUSTSTORE_KEY.to_string(),
                }],
            },
        },
    }
}
