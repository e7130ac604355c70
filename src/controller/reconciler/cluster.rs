//! # Cluster Access
//!
//! Every Kubernetes API call made during a reconcile pass goes through
//! [`ClusterOps`]. [`KubeCluster`] implements it over a live client; tests
//! provide an in-memory implementation.

use crate::constants::FIELD_MANAGER;
use crate::controller::render::{ManagedKind, ManagedResource};
use crate::crd::{ComponentConfig, MultiClusterEngine, MultiClusterEngineStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Fresh read of an engine; `None` once it is gone
    async fn get_engine(&self, name: &str) -> Result<Option<MultiClusterEngine>, kube::Error>;

    /// Replace `spec.overrides.components`, guarded by the engine's resourceVersion
    async fn replace_component_overrides(
        &self,
        engine: &MultiClusterEngine,
        components: &[ComponentConfig],
    ) -> Result<MultiClusterEngine, kube::Error>;

    async fn patch_engine_status(
        &self,
        name: &str,
        status: &MultiClusterEngineStatus,
    ) -> Result<(), kube::Error>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, kube::Error>;

    async fn get_object(
        &self,
        kind: ManagedKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, kube::Error>;

    /// Server-side apply of a desired object
    async fn apply_object(&self, resource: &ManagedResource) -> Result<DynamicObject, kube::Error>;

    /// Delete an object; an object that is already gone is not an error
    async fn delete_object(
        &self,
        kind: ManagedKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), kube::Error>;
}

/// [`ClusterOps`] over a live Kubernetes client
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster").finish_non_exhaustive()
    }
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(&self, kind: ManagedKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) if kind.namespaced() => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn get_engine(&self, name: &str) -> Result<Option<MultiClusterEngine>, kube::Error> {
        Api::<MultiClusterEngine>::all(self.client.clone())
            .get_opt(name)
            .await
    }

    async fn replace_component_overrides(
        &self,
        engine: &MultiClusterEngine,
        components: &[ComponentConfig],
    ) -> Result<MultiClusterEngine, kube::Error> {
        let api: Api<MultiClusterEngine> = Api::all(self.client.clone());
        let patch = serde_json::json!({
            "metadata": {"resourceVersion": engine.resource_version()},
            "spec": {"overrides": {"components": components}},
        });
        api.patch(
            &engine.name_any(),
            &PatchParams::default(),
            &Patch::Merge(patch),
        )
        .await
    }

    async fn patch_engine_status(
        &self,
        name: &str,
        status: &MultiClusterEngineStatus,
    ) -> Result<(), kube::Error> {
        let api: Api<MultiClusterEngine> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, kube::Error> {
        Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
    }

    async fn get_object(
        &self,
        kind: ManagedKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, kube::Error> {
        self.dynamic_api(kind, namespace).get_opt(name).await
    }

    async fn apply_object(&self, resource: &ManagedResource) -> Result<DynamicObject, kube::Error> {
        let api = self.dynamic_api(resource.kind, resource.namespace().as_deref());
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&resource.name(), &params, &Patch::Apply(&resource.object))
            .await
    }

    async fn delete_object(
        &self,
        kind: ManagedKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), kube::Error> {
        match self
            .dynamic_api(kind, namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                debug!(kind = %kind, name, "Object already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
