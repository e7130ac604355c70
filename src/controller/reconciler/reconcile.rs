//! # Reconcile
//!
//! One reconcile pass for a `MultiClusterEngine`.
//!
//! Every pass starts from a fresh read of the engine and derives everything
//! else from it: the effective configuration, image references, the desired
//! resource set and finally the status. Nothing is carried between passes
//! except per-engine error backoff.
//!
//! ## Pass Order
//!
//! 1. Re-read the engine; stop if it is gone or terminating
//! 2. Deduplicate component overrides, persisting the result when it changed
//! 3. Load image pins and build the image resolver
//! 4. Synthesize the desired state
//! 5. Apply desired resources and remove those of disabled components
//! 6. Observe readiness and publish status when it changed

use crate::config::ControllerConfig;
use crate::constants::{ANNOTATION_IMAGE_OVERRIDES_CM, ANNOTATION_IMAGE_REPOSITORY};
use crate::controller::images::{ImageDefaults, ImagePins, ImageResolver};
use crate::controller::overrides::{self, EffectiveConfig};
use crate::controller::reconciler::apply::reconcile_resources;
use crate::controller::reconciler::cluster::ClusterOps;
use crate::controller::reconciler::status::{aggregate, observe, AggregatedStatus, Health};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::render::synthesize;
use crate::crd::{MultiClusterEngine, MultiClusterEngineStatus};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Reconcile one engine within the configured deadline
pub async fn reconcile(
    obj: Arc<MultiClusterEngine>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let start = Instant::now();
    observability::metrics::increment_reconciliations();

    let config = ctx.controller_config.read().await.clone();
    let deadline = config.reconcile_timeout_duration();

    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = name.as_str(),
        resource.generation = obj.metadata.generation.unwrap_or(0),
    );
    let result = match tokio::time::timeout(deadline, reconcile_pass(&name, &ctx, &config))
        .instrument(span)
        .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(resource.name = name.as_str(), "Reconcile pass exceeded {:?}", deadline);
            Err(ReconcilerError::Timeout(deadline))
        }
    };

    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    if result.is_ok() {
        ctx.reset_backoff(&name);
    }
    result
}

async fn reconcile_pass(
    name: &str,
    ctx: &Reconciler,
    config: &ControllerConfig,
) -> Result<Action, ReconcilerError> {
    let cluster = ctx.cluster.as_ref();

    let Some(mut engine) = cluster.get_engine(name).await? else {
        debug!("Engine no longer exists, nothing to do");
        return Ok(Action::await_change());
    };
    if engine.metadata.deletion_timestamp.is_some() {
        info!("Engine is terminating, leaving owned resources to garbage collection");
        return Ok(Action::await_change());
    }

    let resolution = overrides::resolve(&engine.spec);
    if resolution.needs_write {
        info!(
            before = engine.component_overrides().len(),
            after = resolution.deduplicated.len(),
            "Persisting deduplicated component overrides"
        );
        engine = cluster
            .replace_component_overrides(&engine, &resolution.deduplicated)
            .await?;
        observability::metrics::increment_overrides_deduplicated();
    }

    let previous = engine.status.clone();
    let aggregated = match converge(cluster, &ctx.image_defaults, config, &engine, &resolution.effective)
        .await
    {
        Ok(aggregated) => aggregated,
        // Transient API failures are retried without touching status
        Err(e) if !e.is_transient() => {
            let degraded = AggregatedStatus::failure(e.reason(), e.to_string());
            if let Err(write_err) =
                publish_status(cluster, &engine, previous.as_ref(), degraded).await
            {
                warn!(error = %write_err, "Failed to record degraded status");
            }
            observability::metrics::set_engine_available(name, false);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let health = aggregated.health;
    publish_status(cluster, &engine, previous.as_ref(), aggregated).await?;
    observability::metrics::set_engine_available(name, health == Health::Available);

    let (requeue_after, reason) = match health {
        Health::Available => (config.resync_interval_duration(), "resync"),
        Health::Progressing => (config.progressing_requeue_duration(), "progressing"),
        Health::Degraded => (config.reconciliation_error_requeue_duration(), "degraded"),
    };
    debug!(?health, "Requeue in {:?}", requeue_after);
    observability::metrics::increment_requeues_total(reason);
    Ok(Action::requeue(requeue_after))
}

/// Steps 3 to 6 minus the status write
async fn converge(
    cluster: &dyn ClusterOps,
    defaults: &ImageDefaults,
    config: &ControllerConfig,
    engine: &MultiClusterEngine,
    effective: &EffectiveConfig,
) -> Result<AggregatedStatus, ReconcilerError> {
    let pins = load_pins(cluster, config, engine).await?;
    let images = ImageResolver::new(
        defaults,
        engine.annotation(ANNOTATION_IMAGE_REPOSITORY),
        &pins,
    );
    let desired = synthesize(effective, &images, engine)?;

    let owner_uid = engine.metadata.uid.as_deref().unwrap_or_default();
    let report = reconcile_resources(cluster, &desired, owner_uid).await?;
    debug!(
        applied = report.applied,
        removed = report.removed,
        namespace_created = report.namespace_created,
        "Applied desired state"
    );

    let observed = observe(cluster, &desired.apply).await?;
    Ok(aggregate(&observed))
}

/// Image pins named by the engine's annotation, read from the operator namespace
///
/// A ConfigMap that does not exist yields no pins; one that cannot be parsed is an error.
async fn load_pins(
    cluster: &dyn ClusterOps,
    config: &ControllerConfig,
    engine: &MultiClusterEngine,
) -> Result<ImagePins, ReconcilerError> {
    let Some(cm_name) = engine.annotation(ANNOTATION_IMAGE_OVERRIDES_CM) else {
        return Ok(ImagePins::empty());
    };
    match cluster
        .get_config_map(&config.operator_namespace, cm_name)
        .await?
    {
        Some(config_map) => {
            let pins = ImagePins::from_config_map(&config_map)?;
            debug!(config_map = cm_name, pins = pins.len(), "Loaded image pins");
            Ok(pins)
        }
        None => {
            warn!(
                config_map = cm_name,
                namespace = config.operator_namespace.as_str(),
                "Image override ConfigMap not found, using default images"
            );
            Ok(ImagePins::empty())
        }
    }
}

/// Stamp and write status, skipping the write when nothing changed
async fn publish_status(
    cluster: &dyn ClusterOps,
    engine: &MultiClusterEngine,
    previous: Option<&MultiClusterEngineStatus>,
    aggregated: AggregatedStatus,
) -> Result<(), kube::Error> {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let status = aggregated.into_status(previous, engine.metadata.generation, &now);
    if previous == Some(&status) {
        debug!("Status unchanged, skipping update");
        return Ok(());
    }
    info!(
        phase = status.phase.map_or("Unknown", |p| p.as_str()),
        "Updating engine status"
    );
    cluster
        .patch_engine_status(&engine.name_any(), &status)
        .await
}
