//! # Apply
//!
//! Drives the live cluster toward a [`DesiredState`].
//!
//! Desired objects are server-side applied, so a missing object is created
//! and a drifted one is patched in place. Objects of disabled components are
//! deleted, but only when this engine is their controller.

use crate::controller::reconciler::cluster::ClusterOps;
use crate::controller::render::{DesiredState, ManagedResource};
use crate::observability;
use kube::api::DynamicObject;
use tracing::{debug, error, info};

/// What a pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub namespace_created: bool,
    pub applied: usize,
    pub removed: usize,
}

/// Apply `desired` and remove resources of disabled components
///
/// `owner_uid` is the uid of the engine; removals skip anything it does not control.
pub async fn reconcile_resources(
    cluster: &dyn ClusterOps,
    desired: &DesiredState,
    owner_uid: &str,
) -> Result<ApplyReport, kube::Error> {
    let mut report = ApplyReport {
        namespace_created: ensure_namespace(cluster, &desired.namespace).await?,
        ..Default::default()
    };

    for resource in &desired.apply {
        let start = std::time::Instant::now();
        if let Err(e) = cluster.apply_object(resource).await {
            error!(resource = %resource.key(), error = %e, "Failed to apply resource");
            observability::metrics::increment_apply_errors(resource.kind.kind());
            return Err(e);
        }
        observability::metrics::record_apply(resource.kind.kind(), start.elapsed().as_secs_f64());
        report.applied += 1;
    }

    for resource in &desired.remove {
        if remove_if_controlled(cluster, resource, owner_uid).await? {
            report.removed += 1;
        }
    }

    Ok(report)
}

/// Create the target namespace when it is absent; an existing one is left untouched
async fn ensure_namespace(
    cluster: &dyn ClusterOps,
    namespace: &ManagedResource,
) -> Result<bool, kube::Error> {
    if cluster
        .get_object(namespace.kind, None, &namespace.name())
        .await?
        .is_some()
    {
        return Ok(false);
    }
    info!(namespace = %namespace.name(), "Creating target namespace");
    cluster.apply_object(namespace).await?;
    Ok(true)
}

async fn remove_if_controlled(
    cluster: &dyn ClusterOps,
    resource: &ManagedResource,
    owner_uid: &str,
) -> Result<bool, kube::Error> {
    let namespace = resource.namespace();
    let name = resource.name();
    let Some(live) = cluster
        .get_object(resource.kind, namespace.as_deref(), &name)
        .await?
    else {
        return Ok(false);
    };

    if !controlled_by(&live, owner_uid) {
        debug!(
            resource = %resource.key(),
            "Leaving resource of disabled component in place - not controlled by this engine"
        );
        return Ok(false);
    }

    info!(
        resource = %resource.key(),
        component = resource.component.map_or("core", |c| c.as_str()),
        "Removing resource of disabled component"
    );
    cluster
        .delete_object(resource.kind, namespace.as_deref(), &name)
        .await?;
    observability::metrics::increment_resources_removed(resource.kind.kind());
    Ok(true)
}

fn controlled_by(live: &DynamicObject, owner_uid: &str) -> bool {
    live.metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| {
            refs.iter()
                .any(|r| r.uid == owner_uid && r.controller == Some(true))
        })
}
