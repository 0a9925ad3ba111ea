//! # Generated Secrets
//!
//! Idempotent creation of the Secrets the engine derives for an Infra.
//!
//! A generated Secret is looked up by its conventional name first. Only when
//! it is missing is its content derived and the Secret created. A create that
//! loses a race with a concurrent pass fails with `AlreadyExists`, which
//! [`retry_on_conflict`] turns into a fresh lookup, so every pass ends up
//! using the single Secret that won.

use std::collections::BTreeMap;
use std::future::Future;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::constants::{CREDENTIAL_PASSWORD_KEY, CREDENTIAL_USERNAME_KEY};
use crate::controller::reconciler::context::ClusterContext;
use crate::controller::reconciler::dispatch::BackingKind;
use crate::controller::reconciler::error::InfraError;
use crate::controller::reconciler::store::{retry_on_conflict, IsConflict};
use crate::observability::metrics;

/// Username and password derived for a backing instance
///
/// The password is wiped from memory on drop.
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl IsConflict for InfraError {
    fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_conflict())
    }
}

/// Get the Secret `secret_name`, creating it from `derive` when it does not exist
///
/// `derive` only runs when the Secret is missing. An existing Secret is
/// returned unchanged, whatever its content.
///
/// # Errors
///
/// Errors from `derive`, or store errors that persist past the conflict retries
pub async fn load_or_create_secret<F, Fut>(
    ctx: &ClusterContext<'_>,
    secret_name: &str,
    kind: BackingKind,
    derive: F,
) -> Result<Secret, InfraError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<BTreeMap<String, ByteString>, InfraError>>,
{
    let derive = &derive;
    retry_on_conflict(ctx.conflict_retry_attempts, move |attempt| async move {
        let data = match derive_if_missing(ctx, secret_name, derive).await? {
            Existing::Found(secret) => {
                debug!(secret = %secret_name, attempt, "reusing generated secret");
                return Ok(*secret);
            }
            Existing::Missing(data) => data,
        };

        let secret = Secret {
            metadata: ctx.owned_metadata(secret_name),
            type_: Some("Opaque".to_string()),
            data: Some(data),
            ..Secret::default()
        };
        let created = ctx.store.create_secret(&ctx.namespace, &secret).await?;
        info!(
            secret = %secret_name,
            namespace = %ctx.namespace,
            backing.kind = %kind,
            "created generated secret"
        );
        metrics::increment_credential_secrets_created(kind.metric_label());
        Ok(created)
    })
    .await
}

enum Existing {
    Found(Box<Secret>),
    Missing(BTreeMap<String, ByteString>),
}

async fn derive_if_missing<F, Fut>(
    ctx: &ClusterContext<'_>,
    secret_name: &str,
    derive: &F,
) -> Result<Existing, InfraError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<BTreeMap<String, ByteString>, InfraError>>,
{
    if let Some(secret) = ctx.store.get_secret(&ctx.namespace, secret_name).await? {
        return Ok(Existing::Found(Box::new(secret)));
    }
    Ok(Existing::Missing(derive().await?))
}

/// Get or create a credential Secret holding `username` and `password` keys
///
/// # Errors
///
/// Errors from `derive`, or store errors that persist past the conflict retries
pub async fn load_or_create_credential_secret<F, Fut>(
    ctx: &ClusterContext<'_>,
    secret_name: &str,
    kind: BackingKind,
    derive: F,
) -> Result<Secret, InfraError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Credentials, InfraError>>,
{
    load_or_create_secret(ctx, secret_name, kind, || {
        let credentials = derive();
        async move {
            let credentials = credentials.await?;
            Ok(BTreeMap::from([
                (
                    CREDENTIAL_USERNAME_KEY.to_string(),
                    ByteString(credentials.username.into_bytes()),
                ),
                (
                    CREDENTIAL_PASSWORD_KEY.to_string(),
                    ByteString(credentials.password.as_bytes().to_vec()),
                ),
            ]))
        }
    })
    .await
}

/// Read a key of a Secret as UTF-8
#[must_use]
pub fn secret_string(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .and_then(|value| String::from_utf8(value.0.clone()).ok())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key))
                .cloned()
        })
}
