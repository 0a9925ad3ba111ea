//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `infra_reconciliations_total` - Total number of reconciliation passes
//! - `infra_reconciliation_errors_total{reason}` - Failed passes by condition reason
//! - `infra_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `infra_backing_instances_provisioned_total{kind}` - Default backing instances created
//! - `infra_credential_secrets_created_total{kind}` - Generated Secrets created
//! - `infra_requeues_total{trigger}` - Requeues by trigger source

use anyhow::Result;
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "infra_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "infra_reconciliation_errors_total",
            "Total number of reconciliation errors by condition reason",
        ),
        &["reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "infra_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static BACKING_INSTANCES_PROVISIONED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "infra_backing_instances_provisioned_total",
            "Total number of default backing instances provisioned by kind",
        ),
        &["kind"],
    )
    .expect(
        "Failed to create BACKING_INSTANCES_PROVISIONED_TOTAL metric - this should never happen",
    )
});

static CREDENTIAL_SECRETS_CREATED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "infra_credential_secrets_created_total",
            "Total number of credential and trust store secrets created by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create CREDENTIAL_SECRETS_CREATED_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "infra_requeues_total",
            "Total number of reconciliation requeues by trigger source",
        ),
        &["trigger"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register every metric with the controller registry
///
/// # Errors
///
/// Fails when called twice, metrics can only be registered once.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(BACKING_INSTANCES_PROVISIONED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIAL_SECRETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[reason])
        .inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_backing_instances_provisioned(kind: &str) {
    BACKING_INSTANCES_PROVISIONED_TOTAL
        .with_label_values(&[kind])
        .inc();
}

pub fn increment_credential_secrets_created(kind: &str) {
    CREDENTIAL_SECRETS_CREATED_TOTAL
        .with_label_values(&[kind])
        .inc();
}

pub fn increment_requeues_total(trigger: &str) {
    REQUEUES_TOTAL.with_label_values(&[trigger]).inc();
}

/// Encode the registry in the Prometheus text format
///
/// # Errors
///
/// Encoding failures from the text encoder
pub fn encode_metrics() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        let after = RECONCILIATIONS_TOTAL.get();
        assert!(after > before);
    }

    #[test]
    fn test_increment_reconciliation_errors_by_reason() {
        let counter = RECONCILIATION_ERRORS_TOTAL.with_label_values(&["ResourceNotReady"]);
        let before = counter.get();
        increment_reconciliation_errors("ResourceNotReady");
        assert!(counter.get() > before);
    }

    #[test]
    fn test_increment_requeues_by_trigger() {
        let counter = REQUEUES_TOTAL.with_label_values(&["provisioning"]);
        let before = counter.get();
        increment_requeues_total("provisioning");
        assert!(counter.get() > before);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let before = RECONCILIATION_DURATION.get_sample_count();
        observe_reconciliation_duration(0.25);
        assert!(RECONCILIATION_DURATION.get_sample_count() > before);
    }
}
