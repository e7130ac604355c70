//! # Observation
//!
//! Reads back every desired resource and classifies its readiness.

use crate::controller::reconciler::cluster::ClusterOps;
use crate::controller::render::{ManagedKind, ManagedResource};
use k8s_openapi::api::apps::v1::DeploymentStatus;
use kube::api::DynamicObject;

/// Readiness of one managed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Missing,
    Progressing(String),
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResource {
    pub kind: ManagedKind,
    pub name: String,
    pub state: ResourceState,
}

/// Fetch and classify every resource in `desired`
pub async fn observe(
    cluster: &dyn ClusterOps,
    desired: &[ManagedResource],
) -> Result<Vec<ObservedResource>, kube::Error> {
    let mut observed = Vec::with_capacity(desired.len());
    for resource in desired {
        let live = cluster
            .get_object(resource.kind, resource.namespace().as_deref(), &resource.name())
            .await?;
        observed.push(ObservedResource {
            kind: resource.kind,
            name: resource.name(),
            state: live.map_or(ResourceState::Missing, |obj| assess(resource.kind, &obj)),
        });
    }
    Ok(observed)
}

/// Classify a live object
#[must_use]
pub fn assess(kind: ManagedKind, live: &DynamicObject) -> ResourceState {
    match kind {
        ManagedKind::Deployment => assess_deployment(live),
        _ => assess_generic(live),
    }
}

fn assess_deployment(live: &DynamicObject) -> ResourceState {
    let Some(raw_status) = live.data.get("status").filter(|s| !s.is_null()) else {
        return ResourceState::Progressing("Deployment has not reported status".to_string());
    };
    let status: DeploymentStatus = match serde_json::from_value(raw_status.clone()) {
        Ok(status) => status,
        Err(e) => return ResourceState::Progressing(format!("Unreadable status: {e}")),
    };
    let desired = live
        .data
        .pointer("/spec/replicas")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(1);

    for condition in status.conditions.iter().flatten() {
        let message = condition.message.clone().unwrap_or_default();
        if condition.type_ == "ReplicaFailure" && condition.status == "True" {
            return ResourceState::Failed(message);
        }
        if condition.type_ == "Progressing"
            && condition.status == "False"
            && condition.reason.as_deref() == Some("ProgressDeadlineExceeded")
        {
            return ResourceState::Failed(message);
        }
    }

    if let (Some(generation), Some(observed)) = (live.metadata.generation, status.observed_generation)
    {
        if observed < generation {
            return ResourceState::Progressing("Rollout not yet observed".to_string());
        }
    }

    let updated = i64::from(status.updated_replicas.unwrap_or(0));
    let available = i64::from(status.available_replicas.unwrap_or(0));
    if updated < desired {
        return ResourceState::Progressing(format!("{updated} of {desired} replicas updated"));
    }
    if available < desired {
        return ResourceState::Progressing(format!("{available} of {desired} replicas available"));
    }
    ResourceState::Ready
}

/// Objects without a rollout are ready once present, unless they report Degraded
fn assess_generic(live: &DynamicObject) -> ResourceState {
    let degraded = live
        .data
        .pointer("/status/conditions")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .find(|c| c["type"] == "Degraded" && c["status"] == "True");
    match degraded {
        Some(condition) => ResourceState::Failed(
            condition["message"]
                .as_str()
                .unwrap_or("Degraded")
                .to_string(),
        ),
        None => ResourceState::Ready,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    fn deployment(generation: i64, status: serde_json::Value) -> DynamicObject {
        object(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "d", "namespace": "ns", "generation": generation},
            "spec": {"replicas": 2},
            "status": status,
        }))
    }

    #[test]
    fn test_ready_deployment() {
        let live = deployment(
            3,
            serde_json::json!({"observedGeneration": 3, "updatedReplicas": 2, "availableReplicas": 2}),
        );
        assert_eq!(assess(ManagedKind::Deployment, &live), ResourceState::Ready);
    }

    #[test]
    fn test_deployment_waiting_for_replicas() {
        let live = deployment(
            1,
            serde_json::json!({"observedGeneration": 1, "updatedReplicas": 2, "availableReplicas": 1}),
        );
        assert!(matches!(
            assess(ManagedKind::Deployment, &live),
            ResourceState::Progressing(_)
        ));
    }

    #[test]
    fn test_deployment_stale_generation() {
        let live = deployment(
            4,
            serde_json::json!({"observedGeneration": 3, "updatedReplicas": 2, "availableReplicas": 2}),
        );
        assert!(matches!(
            assess(ManagedKind::Deployment, &live),
            ResourceState::Progressing(_)
        ));
    }

    #[test]
    fn test_deployment_deadline_exceeded_is_failed() {
        let live = deployment(
            1,
            serde_json::json!({
                "observedGeneration": 1,
                "conditions": [{
                    "type": "Progressing",
                    "status": "False",
                    "reason": "ProgressDeadlineExceeded",
                    "message": "ReplicaSet has timed out progressing."
                }]
            }),
        );
        assert_eq!(
            assess(ManagedKind::Deployment, &live),
            ResourceState::Failed("ReplicaSet has timed out progressing.".to_string())
        );
    }

    #[test]
    fn test_deployment_without_status_is_progressing() {
        let live = object(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "d", "namespace": "ns"},
            "spec": {"replicas": 1},
        }));
        assert!(matches!(
            assess(ManagedKind::Deployment, &live),
            ResourceState::Progressing(_)
        ));
    }

    #[test]
    fn test_generic_objects() {
        let present = object(serde_json::json!({
            "apiVersion": "hive.openshift.io/v1",
            "kind": "HiveConfig",
            "metadata": {"name": "hive"},
        }));
        assert_eq!(assess(ManagedKind::HiveConfig, &present), ResourceState::Ready);

        let degraded = object(serde_json::json!({
            "apiVersion": "hive.openshift.io/v1",
            "kind": "HiveConfig",
            "metadata": {"name": "hive"},
            "status": {"conditions": [{"type": "Degraded", "status": "True", "message": "bad"}]},
        }));
        assert_eq!(
            assess(ManagedKind::HiveConfig, &degraded),
            ResourceState::Failed("bad".to_string())
        );
    }
}
