//! # Watch Loop
//!
//! Controller watch loop that monitors Infra resources and the Secrets they
//! own, and triggers reconciliation when changes are detected.

use crate::constants::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::controller::reconciler::{
    resource_key, ReconcileOutcome, Reconciler, ReconcilerError, TriggerSource,
};
use crate::controller::server::ServerState;
use crate::crd::Infra;
use crate::runtime::error_policy::{handle_reconciliation_error, log_controller_error};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DynamicObject};
use kube::{Client, ResourceExt};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the controller watch loop until a shutdown signal arrives
///
/// # Errors
///
/// Never fails today, the signature leaves room for startup checks.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let config = reconciler.config.clone();
    let (infras, secrets): (Api<Infra>, Api<Secret>) = match config.watch_namespace.as_deref() {
        Some(namespace) => (
            Api::namespaced(client.clone(), namespace),
            Api::namespaced(client, namespace),
        ),
        None => (Api::all(client.clone()), Api::all(client)),
    };
    info!(
        namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        concurrency = config.max_concurrent_reconciliations,
        "Starting controller watch loop..."
    );

    // Mark server as not ready when SIGTERM/SIGINT is received
    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!(
            signal,
            "Received shutdown signal, initiating graceful shutdown..."
        );
        mark_not_ready(&shutdown_server_state);
    });

    let backoff_ctx = reconciler.clone();
    let owned_secrets = watcher::Config::default()
        .labels(&format!("{MANAGED_BY_LABEL}={MANAGED_BY_VALUE}"));

    Controller::new(infras, watcher::Config::default().any_semantic())
        .owns(secrets, owned_secrets)
        .with_config(
            controller::Config::default().concurrency(config.max_concurrent_reconciliations),
        )
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| {
            match result {
                Ok((obj, action)) => {
                    debug!(object = %obj, action = ?action, "watch.event.reconciled");
                }
                Err(err) => {
                    // Deleted before its retry fired, nothing reconciles it again
                    if let controller::Error::ObjectNotFound(obj_ref) = &err {
                        backoff_ctx.reset_backoff(&object_ref_key(obj_ref));
                    }
                    log_controller_error(&err);
                }
            }
            futures::future::ready(())
        })
        .await;

    info!("Controller stopped gracefully");
    Ok(())
}

/// Wait for SIGTERM or SIGINT and return the name of the signal received
///
/// Kubernetes stops pods with SIGTERM, so both are handled. When the SIGTERM
/// handler cannot be installed only SIGINT is awaited.
pub async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => return "SIGTERM",
                    _ = tokio::signal::ctrl_c() => return "SIGINT",
                }
            }
            Err(e) => warn!(
                "Failed to install SIGTERM handler: {}, listening for SIGINT only",
                e
            ),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

/// Backoff key of a queued object, matching [`resource_key`]
fn object_ref_key(obj_ref: &ObjectRef<DynamicObject>) -> String {
    format!(
        "{}/{}",
        obj_ref.namespace.as_deref().unwrap_or_default(),
        obj_ref.name
    )
}

/// Flip `/readyz` to not-ready so the pod leaves the Service endpoints
pub fn mark_not_ready(server_state: &ServerState) {
    server_state.is_ready.store(false, Ordering::Relaxed);
}

/// Reconcile one Infra and translate the outcome into a requeue
///
/// # Errors
///
/// The failed pass, handed to [`handle_reconciliation_error`]
pub async fn reconcile(obj: Arc<Infra>, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let namespace = obj.namespace().unwrap_or_default();
    let name = obj.name_any();

    let outcome = ctx.controller.reconcile(&namespace, &name).await?;
    ctx.reset_backoff(&resource_key(&obj));

    let trigger = match outcome {
        ReconcileOutcome::Done => TriggerSource::Resync,
        ReconcileOutcome::Requeue => TriggerSource::Provisioning,
    };
    let delay = match outcome {
        ReconcileOutcome::Done => ctx.config.resync_interval_duration(),
        ReconcileOutcome::Requeue => ctx.config.provision_requeue_duration(),
    };
    debug!(
        resource.name = %name,
        resource.namespace = %namespace,
        trigger = trigger.as_str(),
        delay_secs = delay.as_secs(),
        "requeueing"
    );
    crate::observability::metrics::increment_requeues_total(trigger.as_str());
    Ok(Action::requeue(delay))
}
