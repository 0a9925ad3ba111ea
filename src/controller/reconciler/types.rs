//! # Types
//!
//! Core types for the reconciler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::config::SharedControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::error::InfraError;
use crate::controller::reconciler::reconcile::BindingController;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    Binding(#[from] InfraError),
}

impl ReconcilerError {
    /// Condition reason label used for metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Binding(err) => err.reason().as_str(),
        }
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Properties are published, check again on the resync interval
    Done,
    /// State changed (a default instance was provisioned), check again soon
    Requeue,
}

/// Why a reconciliation was requeued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Periodic resync after a successful pass
    Resync,
    /// Follow-up after provisioning a default instance
    Provisioning,
    /// Fibonacci backoff after a failed pass
    ErrorBackoff,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Resync => "resync",
            TriggerSource::Provisioning => "provisioning",
            TriggerSource::ErrorBackoff => "error-backoff",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_seconds, max_seconds),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Shared context handed to every reconciliation by the watch loop
#[derive(Clone)]
pub struct Reconciler {
    pub controller: BindingController,
    pub config: SharedControllerConfig,
    // Backoff state per resource (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(controller: BindingController, config: SharedControllerConfig) -> Self {
        Self {
            controller,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Forget the backoff of a resource after it reconciled cleanly
    ///
    /// The entry is dropped rather than reset so the map only holds resources
    /// that are currently failing. Deleted Infras end with a clean pass too.
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_state_counts_errors() {
        let mut state = BackoffState::new(5, 300);
        state.increment_error();
        state.increment_error();
        assert_eq!(state.error_count, 2);
        assert_eq!(state.backoff.next_backoff_seconds(), 5);
    }

    #[test]
    fn test_trigger_source_labels() {
        assert_eq!(TriggerSource::Resync.as_str(), "resync");
        assert_eq!(TriggerSource::Provisioning.as_str(), "provisioning");
        assert_eq!(TriggerSource::ErrorBackoff.as_str(), "error-backoff");
    }
}
