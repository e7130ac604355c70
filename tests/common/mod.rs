//! Common test utilities for reconcile flow tests
//!
//! Provides an in-memory [`ClusterOps`] implementation and helpers to build
//! engines and reconcilers against it.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use async_trait::async_trait;
use backplane_operator::config::ControllerConfig;
use backplane_operator::controller::images::ImageDefaults;
use backplane_operator::controller::reconciler::{ClusterOps, Reconciler};
use backplane_operator::controller::render::{ManagedKind, ManagedResource};
use backplane_operator::crd::{
    ComponentConfig, MultiClusterEngine, MultiClusterEngineSpec, MultiClusterEngineStatus,
    Overrides,
};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::DynamicObject;
use kube::error::ErrorResponse;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

pub const ENGINE_NAME: &str = "multiclusterengine";
pub const ENGINE_UID: &str = "6a1d2f7e-0000-4000-8000-0000000000aa";
pub const TARGET_NAMESPACE: &str = "multicluster-engine";
pub const OPERATOR_NAMESPACE: &str = "backplane-operator-system";

/// Cluster state held by [`FakeCluster`]
#[derive(Debug, Default)]
pub struct FakeState {
    pub engines: BTreeMap<String, MultiClusterEngine>,
    /// Keyed by `namespace/name`
    pub config_maps: BTreeMap<String, ConfigMap>,
    /// Keyed like `ManagedResource::key`
    pub objects: BTreeMap<String, DynamicObject>,
    pub applies: usize,
    pub status_writes: usize,
    pub override_writes: usize,
    pub deleted: Vec<String>,
    /// Status code returned by the next apply, then cleared
    pub fail_next_apply: Option<u16>,
    next_uid: u64,
}

/// In-memory stand-in for the Kubernetes API
#[derive(Debug, Default)]
pub struct FakeCluster {
    pub state: Mutex<FakeState>,
}

pub fn object_key(kind: ManagedKind, namespace: Option<&str>, name: &str) -> String {
    match namespace.filter(|_| kind.namespaced()) {
        Some(ns) => format!("{kind}/{ns}/{name}"),
        None => format!("{kind}/{name}"),
    }
}

fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    })
}

impl FakeCluster {
    pub fn with_engine(engine: MultiClusterEngine) -> Arc<Self> {
        let cluster = Self::default();
        cluster.put_engine(engine);
        Arc::new(cluster)
    }

    pub fn put_engine(&self, engine: MultiClusterEngine) {
        let mut state = self.state.lock().unwrap();
        state.engines.insert(engine.name_any(), engine);
    }

    /// Current stored engine
    pub fn engine(&self) -> MultiClusterEngine {
        self.state.lock().unwrap().engines[ENGINE_NAME].clone()
    }

    pub fn status(&self) -> MultiClusterEngineStatus {
        self.engine().status.unwrap_or_default()
    }

    /// Mutate the stored engine spec as a user edit would
    pub fn edit_spec(&self, edit: impl FnOnce(&mut MultiClusterEngineSpec)) {
        let mut state = self.state.lock().unwrap();
        let engine = state.engines.get_mut(ENGINE_NAME).unwrap();
        edit(&mut engine.spec);
        bump(&mut engine.metadata.generation);
        engine.metadata.resource_version = Some(next_version(engine.metadata.resource_version.as_deref()));
    }

    pub fn put_config_map(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let mut config_map = ConfigMap::default();
        config_map.metadata.name = Some(name.to_string());
        config_map.metadata.namespace = Some(namespace.to_string());
        config_map.data = Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self.state
            .lock()
            .unwrap()
            .config_maps
            .insert(format!("{namespace}/{name}"), config_map);
    }

    pub fn put_object(&self, kind: ManagedKind, object: DynamicObject) {
        let key = object_key(kind, object.namespace().as_deref(), &object.name_any());
        self.state.lock().unwrap().objects.insert(key, object);
    }

    pub fn object(&self, key: &str) -> Option<DynamicObject> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(key)
    }

    pub fn remove(&self, key: &str) {
        self.state.lock().unwrap().objects.remove(key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn deployments(&self) -> Vec<DynamicObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with("Deployment/"))
            .map(|(_, obj)| obj.clone())
            .collect()
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    pub fn override_writes(&self) -> usize {
        self.state.lock().unwrap().override_writes
    }

    pub fn fail_next_apply(&self, code: u16) {
        self.state.lock().unwrap().fail_next_apply = Some(code);
    }

    /// Report every Deployment as fully rolled out, as the deployment controller would
    pub fn mark_deployments_ready(&self) {
        let mut state = self.state.lock().unwrap();
        for (key, object) in &mut state.objects {
            if !key.starts_with("Deployment/") {
                continue;
            }
            let replicas = object
                .data
                .pointer("/spec/replicas")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(1);
            object.data["status"] = serde_json::json!({
                "observedGeneration": object.metadata.generation.unwrap_or(1),
                "replicas": replicas,
                "updatedReplicas": replicas,
                "readyReplicas": replicas,
                "availableReplicas": replicas,
            });
        }
    }
}

fn bump(generation: &mut Option<i64>) {
    *generation = Some(generation.unwrap_or(0) + 1);
}

fn next_version(current: Option<&str>) -> String {
    let n: u64 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
    (n + 1).to_string()
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn get_engine(&self, name: &str) -> Result<Option<MultiClusterEngine>, kube::Error> {
        Ok(self.state.lock().unwrap().engines.get(name).cloned())
    }

    async fn replace_component_overrides(
        &self,
        engine: &MultiClusterEngine,
        components: &[ComponentConfig],
    ) -> Result<MultiClusterEngine, kube::Error> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .engines
            .get_mut(&engine.name_any())
            .ok_or_else(|| api_error(404, "NotFound", "engine not found"))?;
        if stored.metadata.resource_version != engine.metadata.resource_version {
            return Err(api_error(409, "Conflict", "the object has been modified"));
        }
        stored
            .spec
            .overrides
            .get_or_insert_with(Overrides::default)
            .components = components.to_vec();
        bump(&mut stored.metadata.generation);
        stored.metadata.resource_version =
            Some(next_version(stored.metadata.resource_version.as_deref()));
        let updated = stored.clone();
        state.override_writes += 1;
        Ok(updated)
    }

    async fn patch_engine_status(
        &self,
        name: &str,
        status: &MultiClusterEngineStatus,
    ) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .engines
            .get_mut(name)
            .ok_or_else(|| api_error(404, "NotFound", "engine not found"))?;
        stored.status = Some(status.clone());
        stored.metadata.resource_version =
            Some(next_version(stored.metadata.resource_version.as_deref()));
        state.status_writes += 1;
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, kube::Error> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .config_maps
            .get(&format!("{namespace}/{name}"))
            .cloned())
    }

    async fn get_object(
        &self,
        kind: ManagedKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, kube::Error> {
        Ok(self.object(&object_key(kind, namespace, name)))
    }

    async fn apply_object(&self, resource: &ManagedResource) -> Result<DynamicObject, kube::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(code) = state.fail_next_apply.take() {
            return Err(api_error(code, "InternalError", "injected apply failure"));
        }

        let key = object_key(
            resource.kind,
            resource.namespace().as_deref(),
            &resource.name(),
        );
        let mut object = resource.object.clone();
        match state.objects.get(&key) {
            Some(existing) => {
                object.metadata.uid.clone_from(&existing.metadata.uid);
                let spec_changed = existing.data.get("spec") != object.data.get("spec");
                object.metadata.generation = existing.metadata.generation;
                if spec_changed {
                    bump(&mut object.metadata.generation);
                }
                if let Some(status) = existing.data.get("status") {
                    object.data["status"] = status.clone();
                }
            }
            None => {
                state.next_uid += 1;
                object.metadata.uid = Some(format!("object-uid-{}", state.next_uid));
                object.metadata.generation = Some(1);
            }
        }
        state.objects.insert(key, object.clone());
        state.applies += 1;
        Ok(object)
    }

    async fn delete_object(
        &self,
        kind: ManagedKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), kube::Error> {
        let key = object_key(kind, namespace, name);
        let mut state = self.state.lock().unwrap();
        state.objects.remove(&key);
        state.deleted.push(key);
        Ok(())
    }
}

/// Engine as the API server would return it after creation
pub fn engine(spec: MultiClusterEngineSpec) -> MultiClusterEngine {
    let mut engine = MultiClusterEngine::new(ENGINE_NAME, spec);
    engine.metadata.uid = Some(ENGINE_UID.to_string());
    engine.metadata.generation = Some(1);
    engine.metadata.resource_version = Some("1".to_string());
    engine
}

pub fn default_spec() -> MultiClusterEngineSpec {
    MultiClusterEngineSpec {
        target_namespace: TARGET_NAMESPACE.to_string(),
        ..Default::default()
    }
}

pub fn with_components(components: &[(backplane_operator::crd::ComponentName, bool)]) -> MultiClusterEngineSpec {
    MultiClusterEngineSpec {
        overrides: Some(Overrides {
            components: components
                .iter()
                .map(|(name, enabled)| ComponentConfig::new(*name, *enabled))
                .collect(),
            ..Default::default()
        }),
        ..default_spec()
    }
}

/// Defaults shaped like a release: `quay.io/stolostron/<name>@sha256:<key>`
pub fn image_defaults() -> ImageDefaults {
    ImageDefaults::from_lookup(|var| {
        let name = var
            .trim_start_matches("OPERAND_IMAGE_")
            .to_ascii_lowercase()
            .replace('_', "-");
        Some(format!("quay.io/stolostron/{name}@sha256:{name}"))
    })
    .unwrap()
}

pub fn reconciler(cluster: &Arc<FakeCluster>) -> Arc<Reconciler> {
    let config = ControllerConfig {
        operator_namespace: OPERATOR_NAMESPACE.to_string(),
        ..ControllerConfig::default()
    };
    let cluster: Arc<dyn ClusterOps> = Arc::clone(cluster) as Arc<dyn ClusterOps>;
    Arc::new(Reconciler::new(
        cluster,
        image_defaults(),
        Arc::new(RwLock::new(config)),
    ))
}

/// Container specs of the Deployment stored under `key`
pub fn containers(cluster: &FakeCluster, key: &str) -> Vec<serde_json::Value> {
    cluster
        .object(key)
        .and_then(|d| d.data.pointer("/spec/template/spec/containers").cloned())
        .and_then(|c| c.as_array().cloned())
        .unwrap_or_default()
}
