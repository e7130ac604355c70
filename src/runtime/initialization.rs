//! # Initialization
//!
//! Operator start-up: rustls setup, tracing, metrics, server startup,
//! Kubernetes client setup and discovery of which managed kinds can be watched.

use crate::config::{create_shared_config, SharedControllerConfig, SharedServerConfig};
use crate::controller::images::ImageDefaults;
use crate::controller::reconciler::{KubeCluster, Reconciler};
use crate::controller::render::ManagedKind;
use crate::controller::server::{start_server, ServerState};
use crate::crd::MultiClusterEngine;
use crate::observability;
use anyhow::{anyhow, Context, Result};
use kube::api::{Api, DynamicObject, ListParams};
use kube::{Client, ResourceExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    /// API for the MultiClusterEngine CRD
    pub engines: Api<MultiClusterEngine>,
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: SharedControllerConfig,
    pub server_config: SharedServerConfig,
    /// Managed kinds whose API is served by this cluster
    pub watched_kinds: Vec<ManagedKind>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self.server_state.is_ready.load(Ordering::Relaxed),
            )
            .field("watched_kinds", &self.watched_kinds)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// Fails when the tracing subscriber, metrics or HTTP server cannot be set up,
/// when no Kubernetes client can be built, or when an operand image default is
/// missing from the environment.
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|provider| anyhow!("Failed to install rustls crypto provider: {provider:?}"))?;

    let (controller_config, server_config) = create_shared_config();
    {
        let config = controller_config.read().await;
        observability::init_tracing(&config.log_level, &config.log_format)?;
    }

    info!("Starting backplane operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });
    let server_port = server_config.read().await.metrics_port;
    let server_state_for_task = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_for_task).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, Arc::clone(&server_config)).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    // Missing image defaults are a deployment error, not something a reconcile can fix
    let image_defaults =
        ImageDefaults::from_env().context("Operand image defaults are incomplete")?;

    let engines: Api<MultiClusterEngine> = Api::all(client.clone());
    log_existing_engines(&engines).await;

    let watched_kinds = discover_watchable_kinds(&client).await;

    let reconciler = Arc::new(Reconciler::new(
        Arc::new(KubeCluster::new(client.clone())),
        image_defaults,
        Arc::clone(&controller_config),
    ));

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        engines,
        reconciler,
        server_state,
        controller_config,
        server_config,
        watched_kinds,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: SharedServerConfig,
) -> Result<()> {
    let config = server_config.read().await;
    let startup_timeout = std::time::Duration::from_secs(config.startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(config.poll_interval_ms);
    drop(config);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        // Set by start_server once bound
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Check that the CRD is queryable and summarize existing engines
async fn log_existing_engines(engines: &Api<MultiClusterEngine>) {
    let span = tracing::info_span!("controller.startup.list_engines");
    let _guard = span.enter();

    match engines.list(&ListParams::default()).await {
        Ok(list) => {
            let mut names: Vec<String> = list.items.iter().map(ResourceExt::name_any).collect();
            names.sort();
            info!(
                "CRD is queryable, found {} existing MultiClusterEngine resources: [{}]",
                names.len(),
                names.join(", ")
            );
            if names.len() > 1 {
                warn!("More than one MultiClusterEngine exists; each is reconciled independently");
            }
        }
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - watch will retry");
        }
    }
}

/// Managed kinds the operator can watch
///
/// Built-in kinds are always watched. Kinds provided by other operators are
/// watched only when their API answers a list request.
async fn discover_watchable_kinds(client: &Client) -> Vec<ManagedKind> {
    let mut kinds = Vec::with_capacity(ManagedKind::ALL.len());
    for kind in ManagedKind::ALL {
        if !kind.is_foreign() {
            kinds.push(kind);
            continue;
        }
        let api: Api<DynamicObject> = Api::all_with(client.clone(), &kind.api_resource());
        match api.list(&ListParams::default().limit(1)).await {
            Ok(_) => {
                info!(kind = %kind, "API available, watching owned objects");
                kinds.push(kind);
            }
            Err(e) => {
                warn!(
                    kind = %kind,
                    error = %e,
                    "API not available, owned objects of this kind will not trigger reconciles"
                );
            }
        }
    }
    kinds
}
