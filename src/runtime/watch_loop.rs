//! # Watch Loop
//!
//! Controller watch loop that monitors `MultiClusterEngine` resources and the
//! objects they own, and triggers reconciliation when either changes.

use crate::config::SharedControllerConfig;
use crate::constants::{LABEL_BACKPLANE_NAME, LABEL_MANAGED_BY, MANAGED_BY_VALUE};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::render::ManagedKind;
use crate::controller::server::ServerState;
use crate::crd::MultiClusterEngine;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::{Api, DynamicObject};
use kube::{Client, Resource, ResourceExt};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{controller, watcher, Controller};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

/// Engine that controls a managed object
///
/// Engines are cluster-scoped, so the reference never carries the child's
/// namespace: events from every namespace land on the same queue key as the
/// engine's own events. The controller owner reference decides; the
/// `backplaneconfig.name` label is the fallback for objects whose owner
/// reference was stripped.
#[must_use]
pub fn owning_engine(object: &DynamicObject) -> Option<ObjectRef<MultiClusterEngine>> {
    let kind = MultiClusterEngine::kind(&());
    let api_version = MultiClusterEngine::api_version(&());
    let from_owner = object
        .owner_references()
        .iter()
        .find(|owner| {
            owner.controller == Some(true) && owner.kind == kind && owner.api_version == api_version
        })
        .map(|owner| owner.name.clone());
    from_owner
        .or_else(|| object.labels().get(LABEL_BACKPLANE_NAME).cloned())
        .filter(|name| !name.is_empty())
        .map(|name| ObjectRef::new(&name))
}

/// Build the controller for engines and every watchable managed kind
///
/// Managed objects are narrowed to those carrying the managed-by label; any
/// event on one, deletion included, re-enqueues its controlling engine.
fn build_controller(
    client: &Client,
    engines: Api<MultiClusterEngine>,
    watched_kinds: &[ManagedKind],
    config: controller::Config,
) -> Controller<MultiClusterEngine> {
    let managed = watcher::Config::default().labels(&format!("{LABEL_MANAGED_BY}={MANAGED_BY_VALUE}"));
    let mut controller = Controller::new(engines, watcher::Config::default().any_semantic());
    for kind in watched_kinds {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = Api::all_with(client.clone(), &ar);
        controller = controller.watches_with(api, ar, managed.clone(), |object| {
            owning_engine(&object)
        });
    }
    controller.with_config(config)
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}, listening for SIGINT only", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Mark the server not ready once `signal` resolves
///
/// The watch loop checks readiness after its stream ends, so this is what
/// turns a stream ended by a signal into an exit instead of a restart.
pub async fn mark_not_ready_on<F>(signal: F, server_state: Arc<ServerState>)
where
    F: Future<Output = ()>,
{
    signal.await;
    info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
}

/// Run the controller watch loop
///
/// Handles graceful shutdown and restarts the controller when its stream ends.
pub async fn run_watch_loop(
    client: Client,
    engines: Api<MultiClusterEngine>,
    watched_kinds: Vec<ManagedKind>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    controller_config: SharedControllerConfig,
) -> Result<(), anyhow::Error> {
    let backoff_start_ms = controller_config.read().await.watch_backoff_start_ms;
    let backoff_duration_ms = Arc::new(AtomicU64::new(backoff_start_ms));

    // The controller drains in-flight passes on the same signals
    tokio::spawn(mark_not_ready_on(
        shutdown_signal(),
        Arc::clone(&server_state),
    ));

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let config = controller_config.read().await;
        let runtime_config = controller::Config::default()
            .concurrency(config.max_concurrent_reconciliations)
            .debounce(config.debounce_duration());
        drop(config);

        let backoff = Arc::clone(&backoff_duration_ms);
        let config_for_filter = Arc::clone(&controller_config);
        let watch_span = tracing::info_span!("controller.watch", operation = "watch_loop");

        info!(
            owned_kinds = watched_kinds.len(),
            "Starting controller watch loop..."
        );
        build_controller(&client, engines.clone(), &watched_kinds, runtime_config)
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
            .filter_map(move |x| {
                let backoff = Arc::clone(&backoff);
                let config = Arc::clone(&config_for_filter);
                async move {
                    match &x {
                        Ok((object, _action)) => {
                            let start = config.read().await.watch_backoff_start_ms;
                            backoff.store(start, Ordering::Relaxed);
                            debug!(resource.name = object.name.as_str(), "watch.event.reconciled");
                            Some(x)
                        }
                        // Retry already scheduled by the error policy; never stall the stream here
                        Err(controller::Error::ReconcilerFailed(e, object)) => {
                            debug!(resource.name = object.name.as_str(), error = %e, "watch.event.reconcile_failed");
                            Some(x)
                        }
                        Err(controller::Error::ObjectNotFound(object)) => {
                            debug!(resource.name = object.name.as_str(), "Engine no longer exists (likely deleted)");
                            Some(x)
                        }
                        Err(controller::Error::QueueError(e)) => {
                            let (max_backoff, restart_delay) = {
                                let config = config.read().await;
                                (config.watch_backoff_max_ms, config.watch_restart_delay_secs)
                            };
                            handle_watch_stream_error(e, &backoff, max_backoff, restart_delay)
                                .await
                                .map(|()| x)
                        }
                        Err(e) => {
                            error!("Controller runner error: {:?}", e);
                            Some(x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(watch_span)
            .await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = controller_config
            .read()
            .await
            .watch_restart_delay_after_end_duration();
        warn!("Controller watch stream ended, restarting in {:?}...", delay);
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn managed(namespace: Option<&str>, owner: Option<OwnerReference>, label: Option<&str>) -> DynamicObject {
        let mut object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "ocm-controller"},
        }))
        .unwrap();
        object.metadata.namespace = namespace.map(str::to_string);
        object.metadata.owner_references = owner.map(|o| vec![o]);
        if let Some(label) = label {
            object
                .labels_mut()
                .insert(LABEL_BACKPLANE_NAME.to_string(), label.to_string());
        }
        object
    }

    fn engine_owner(name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "multicluster.openshift.io/v1".to_string(),
            kind: "MultiClusterEngine".to_string(),
            name: name.to_string(),
            uid: "6a1d2f7e-0000-4000-8000-000000000001".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    #[test]
    fn test_children_in_any_namespace_map_to_the_engine_key() {
        let mut mce = MultiClusterEngine::new("multiclusterengine", Default::default());
        mce.metadata.uid = Some("6a1d2f7e-0000-4000-8000-000000000001".to_string());
        let primary = ObjectRef::from_obj(&mce);

        for namespace in [Some("multicluster-engine"), Some("openshift-monitoring"), None] {
            let child = managed(namespace, Some(engine_owner("multiclusterengine")), None);
            let mapped = owning_engine(&child).unwrap();
            assert_eq!(mapped, primary, "{namespace:?}");
            assert_eq!(mapped.namespace, None);
        }
    }

    #[test]
    fn test_label_is_used_without_owner_reference() {
        let child = managed(Some("multicluster-engine"), None, Some("multiclusterengine"));
        assert_eq!(
            owning_engine(&child),
            Some(ObjectRef::new("multiclusterengine"))
        );
    }

    #[test]
    fn test_foreign_owners_are_ignored() {
        let mut foreign = engine_owner("cluster-manager");
        foreign.kind = "ClusterManager".to_string();
        foreign.api_version = "operator.open-cluster-management.io/v1".to_string();
        assert_eq!(owning_engine(&managed(Some("ns"), Some(foreign), None)), None);

        let mut not_controller = engine_owner("multiclusterengine");
        not_controller.controller = None;
        assert_eq!(
            owning_engine(&managed(Some("ns"), Some(not_controller), None)),
            None
        );
    }

    #[tokio::test]
    async fn test_shutdown_signal_marks_server_not_ready() {
        let state = Arc::new(ServerState::default());
        state.is_ready.store(true, Ordering::Relaxed);

        mark_not_ready_on(async {}, Arc::clone(&state)).await;

        assert!(!state.is_ready.load(Ordering::Relaxed));
    }
}
