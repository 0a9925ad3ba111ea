//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and controller stream errors.

use crate::controller::reconciler::{
    resource_key, BackoffState, Reconciler, ReconcilerError, TriggerSource,
};
use crate::crd::Infra;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing Infra never delays
/// another. The state is reset by the watch loop after a clean pass.
pub fn handle_reconciliation_error(
    obj: Arc<Infra>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %name,
        resource.namespace = %namespace,
        reason = error.reason(),
    );
    let _error_guard = error_span.enter();

    let (backoff_seconds, error_count) = next_backoff(&ctx, &resource_key(&obj));
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or_default());

    info!(
        "🔄 Retrying with Fibonacci backoff: {}s (error count: {}, trigger source: {})",
        backoff_seconds,
        error_count,
        TriggerSource::ErrorBackoff.as_str()
    );
    debug!(
        next_retry = %next_trigger_time.to_rfc3339(),
        "next retry scheduled"
    );

    observability::metrics::increment_requeues_total(TriggerSource::ErrorBackoff.as_str());
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Advance the backoff of `resource_key`, returning the delay and error count
fn next_backoff(ctx: &Reconciler, resource_key: &str) -> (u64, u32) {
    match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(resource_key.to_string()).or_insert_with(|| {
                BackoffState::new(ctx.config.backoff_min_secs, ctx.config.backoff_max_secs)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!(
                "Failed to lock backoff_states: {}, using maximum backoff",
                e
            );
            (ctx.config.backoff_max_secs, 0)
        }
    }
}

/// Log an item of the controller stream that did not reconcile cleanly
pub fn log_controller_error<E, Q>(err: &controller::Error<E, Q>)
where
    E: std::error::Error + 'static,
    Q: std::error::Error + 'static,
{
    match err {
        // Already handled by the error policy
        controller::Error::ReconcilerFailed { .. } => {
            debug!(error = %err, "watch.event.reconciliation_failed");
        }
        // Deleted between the event and the reconciliation
        controller::Error::ObjectNotFound { .. } => {
            debug!(error = %err, "watch.event.object_not_found");
        }
        controller::Error::QueueError { .. } => {
            warn!(error = %err, "watch stream error, the watcher will retry");
        }
        _ => error!(error = %err, "Controller stream error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::reconciler::{BindingController, InMemoryStore};

    fn reconciler() -> Reconciler {
        let config = ControllerConfig {
            backoff_min_secs: 5,
            backoff_max_secs: 20,
            ..ControllerConfig::default()
        };
        Reconciler::new(
            BindingController::new(Arc::new(InMemoryStore::new()), 3),
            Arc::new(config),
        )
    }

    #[test]
    fn test_next_backoff_grows_per_resource() {
        let ctx = reconciler();
        assert_eq!(next_backoff(&ctx, "ns/a"), (5, 1));
        assert_eq!(next_backoff(&ctx, "ns/a"), (5, 2));
        assert_eq!(next_backoff(&ctx, "ns/a"), (10, 3));
        assert_eq!(next_backoff(&ctx, "ns/b"), (5, 1));
        assert_eq!(next_backoff(&ctx, "ns/a"), (15, 4));
        assert_eq!(next_backoff(&ctx, "ns/a"), (20, 5));
    }

    #[test]
    fn test_reset_backoff_restarts_sequence() {
        let ctx = reconciler();
        next_backoff(&ctx, "ns/a");
        next_backoff(&ctx, "ns/a");
        next_backoff(&ctx, "ns/a");
        ctx.reset_backoff("ns/a");
        assert_eq!(next_backoff(&ctx, "ns/a"), (5, 1));
    }

    #[test]
    fn test_recovered_resources_leave_no_backoff_state() {
        let ctx = reconciler();
        for i in 0..1000 {
            let key = format!("ns/infra-{i}");
            next_backoff(&ctx, &key);
            next_backoff(&ctx, &key);
            ctx.reset_backoff(&key);
        }
        assert!(ctx.backoff_states.lock().unwrap().is_empty());

        // A resource that never failed is a no-op
        ctx.reset_backoff("ns/healthy");
        assert!(ctx.backoff_states.lock().unwrap().is_empty());
    }

    #[test]
    fn test_only_failing_resources_keep_backoff_state() {
        let ctx = reconciler();
        next_backoff(&ctx, "ns/a");
        next_backoff(&ctx, "ns/b");
        ctx.reset_backoff("ns/a");

        let states = ctx.backoff_states.lock().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states.get("ns/b").map(|s| s.error_count), Some(1));
    }
}
