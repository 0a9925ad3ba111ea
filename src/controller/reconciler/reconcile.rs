//! # Reconciliation Logic
//!
//! One pass of the binding engine for a single Infra resource.
//!
//! A pass reads the Infra, dispatches on the kind of its resource reference,
//! runs the backing-type reconciler against a draft copy, records the outcome
//! as the Infra condition, and persists the status. Every error reaches the
//! status before the pass returns.

use std::sync::Arc;
use std::time::Instant;

use kube::ResourceExt;
use tracing::{debug, field, info, info_span, warn, Instrument};

use crate::controller::reconciler::backing::reconcile_backing;
use crate::controller::reconciler::context::ClusterContext;
use crate::controller::reconciler::dispatch::BackingKind;
use crate::controller::reconciler::error::InfraError;
use crate::controller::reconciler::status;
use crate::controller::reconciler::store::ObjectStore;
use crate::controller::reconciler::types::ReconcileOutcome;
use crate::crd::Infra;
use crate::observability::metrics;

/// Binding engine over an [`ObjectStore`]
#[derive(Clone)]
pub struct BindingController {
    store: Arc<dyn ObjectStore>,
    conflict_retry_attempts: u32,
}

impl std::fmt::Debug for BindingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingController")
            .field("conflict_retry_attempts", &self.conflict_retry_attempts)
            .finish_non_exhaustive()
    }
}

impl BindingController {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, conflict_retry_attempts: u32) -> Self {
        Self {
            store,
            conflict_retry_attempts,
        }
    }

    /// Reconcile the Infra `namespace/name`
    ///
    /// A deleted Infra is `Done`. `Requeue` means a default backing instance
    /// was just provisioned and properties will follow once it is ready.
    ///
    /// # Errors
    ///
    /// The classified [`InfraError`] of a failed pass, already recorded on
    /// the Infra condition when the status write succeeded
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, InfraError> {
        let span = info_span!(
            "infra.reconcile",
            resource.name = %name,
            resource.namespace = %namespace,
            backing.kind = field::Empty,
        );
        self.reconcile_in_span(namespace, name)
            .instrument(span)
            .await
    }

    async fn reconcile_in_span(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, InfraError> {
        let Some(infra) = self.store.get_infra(namespace, name).await? else {
            debug!("infra not found, nothing to reconcile");
            return Ok(ReconcileOutcome::Done);
        };

        let start = Instant::now();
        metrics::increment_reconciliations();

        let mut draft = infra.clone();
        let result = self.bind(&infra, &mut draft).await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(ReconcileOutcome::Done) => {
                status::set_success(&mut draft);
                self.persist(&draft).await?;
                info!("reconciliation succeeded");
                Ok(ReconcileOutcome::Done)
            }
            Ok(ReconcileOutcome::Requeue) => {
                info!("backing instance provisioned, requeueing");
                Ok(ReconcileOutcome::Requeue)
            }
            Err(err) => {
                metrics::increment_reconciliation_errors(err.reason().as_str());
                status::set_failure(&mut draft, &err);
                if let Err(persist_err) = self.persist(&draft).await {
                    warn!(error = %persist_err, "failed to record failure condition");
                }
                warn!(reason = %err.reason(), error = %err, "reconciliation failed");
                Err(err)
            }
        }
    }

    async fn bind(&self, infra: &Infra, draft: &mut Infra) -> Result<ReconcileOutcome, InfraError> {
        let Some(resource) = infra.spec.resource.as_ref() else {
            return Err(InfraError::UnsupportedApiKind {
                kind: "<unset>".to_string(),
                api_version: "<unset>".to_string(),
            });
        };
        let kind = BackingKind::resolve(&resource.kind, &resource.api_version)?;
        tracing::Span::current().record("backing.kind", kind.kind());
        debug!(backing.name = %resource.name, "dispatching to backing reconciler");

        let ctx = ClusterContext::new(self.store.as_ref(), infra, self.conflict_retry_attempts);
        reconcile_backing(&ctx, kind, resource, draft).await
    }

    async fn persist(&self, draft: &Infra) -> Result<(), InfraError> {
        status::persist(self.store.as_ref(), draft, self.conflict_retry_attempts).await?;
        Ok(())
    }
}

/// Reconcile key of an Infra, `namespace/name`
#[must_use]
pub fn resource_key(infra: &Infra) -> String {
    format!(
        "{}/{}",
        infra.namespace().unwrap_or_default(),
        infra.name_any()
    )
}
