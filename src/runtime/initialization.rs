//! # Startup
//!
//! Brings the process up before the watch loop starts: crypto provider,
//! logging, metrics, the probe server and the binding engine.

use crate::config::{ControllerConfig, SharedControllerConfig};
use crate::controller::reconciler::{BindingController, KubeStore, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Everything the watch loop needs once startup succeeded
pub struct InitializationResult {
    pub client: Client,
    /// Binding engine plus per-resource backoff
    pub reconciler: Arc<Reconciler>,
    /// Probe flags, cleared again on shutdown
    pub server_state: Arc<ServerState>,
    pub controller_config: SharedControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "probes_bound",
                &self.server_state.is_ready.load(Ordering::Relaxed),
            )
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Run every startup step in order
///
/// `/readyz` only turns ready after the Kubernetes client exists.
///
/// # Errors
///
/// The first startup step that fails
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let controller_config: SharedControllerConfig = Arc::new(ControllerConfig::from_env());
    init_tracing(&controller_config.log_format);

    info!("Starting Infra Binding Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(config = ?controller_config, "Loaded controller configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());

    let probe_state = Arc::clone(&server_state);
    let port = controller_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, probe_state).await {
            error!(error = %format!("{e:#}"), "probe server stopped");
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &controller_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let store = Arc::new(KubeStore::new(client.clone()));
    let controller = BindingController::new(store, controller_config.conflict_retry_attempts);
    let reconciler = Arc::new(Reconciler::new(controller, controller_config.clone()));

    server_state.controller_ready.store(true, Ordering::Relaxed);
    info!("binding engine ready");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default `infra_binding_controller=info` filter.
fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "infra_binding_controller=info".into());
    if log_format.eq_ignore_ascii_case("text") {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .init();
    }
}

/// Poll until the probe server has bound its port
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + config.server_startup_timeout();

    while !server_state.is_ready.load(Ordering::Relaxed) {
        if server_handle.is_finished() {
            anyhow::bail!("probe server exited during startup");
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!(
                "probe server did not bind within {}s",
                config.server_startup_timeout().as_secs()
            );
        }
        tokio::time::sleep(config.server_poll_interval()).await;
    }

    info!(port = config.metrics_port, "probe server listening");
    Ok(())
}
