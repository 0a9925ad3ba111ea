//! # Infra Binding Controller
//!
//! A Kubernetes controller that binds business-process runtime `Infra`
//! resources to the backing services they depend on.
//!
//! ## Overview
//!
//! For every `Infra` the controller:
//!
//! 1. **Resolves the backing service** - Infinispan, Kafka (Strimzi), Keycloak,
//!    MongoDB Community or a Knative Eventing Broker
//! 2. **Provisions a default instance** - when the Infra names none
//! 3. **Derives credentials** - copies the connecting user into a Secret owned
//!    by the Infra, and packs served certificates into a PKCS#12 trust store
//! 4. **Publishes runtime properties** - application properties and
//!    environment variables for Quarkus and Spring Boot runtimes
//!
//! ## Features
//!
//! - **Multi-namespace**: Watches `Infra` resources across all namespaces, or
//!   one namespace via `WATCH_NAMESPACE`
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use infra_binding_controller::runtime::{initialization, watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;

    watch_loop::run_watch_loop(init.client, init.reconciler, init.server_state).await
}
