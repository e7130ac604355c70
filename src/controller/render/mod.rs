//! # Desired-State Synthesis
//!
//! Pure rendering of the resources implied by one MultiClusterEngine.
//!
//! [`synthesize`] performs no I/O. Every rendered object already carries its
//! single controller owner reference and the operator's labels, so an object
//! created by an interrupted pass is still garbage collected with its owner.
//!
//! - `kinds.rs` - Managed kinds and the `ManagedResource` wrapper
//! - `workload.rs` - Deployment template
//! - `components.rs` - Per-component manifests

mod components;
mod kinds;
mod workload;

pub use kinds::{ManagedKind, ManagedResource};

use crate::constants::{
    CORE_COMPONENT, LABEL_BACKPLANE_NAME, LABEL_COMPONENT, LABEL_MANAGED_BY, MANAGED_BY_VALUE,
};
use crate::controller::images::ImageResolver;
use crate::controller::overrides::EffectiveConfig;
use crate::crd::{ComponentName, MultiClusterEngine};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use thiserror::Error;

/// Internal invariant violations found while rendering
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("MultiClusterEngine {name} has no uid; cannot build an owner reference")]
    MissingOwnerIdentity { name: String },
    #[error("component {component} rendered no manifests")]
    NoManifests { component: ComponentName },
    #[error("workload {name} has no containers")]
    EmptyWorkload { name: String },
    #[error("manifest {name} is not a valid {kind}: {reason}")]
    InvalidManifest {
        kind: &'static str,
        name: String,
        reason: String,
    },
    #[error("failed to serialize {name}: {reason}")]
    Serialization { name: String, reason: String },
}

/// Rendered resources for one pass
#[derive(Debug, Clone)]
pub struct DesiredState {
    /// Target namespace; created when absent, never updated
    pub namespace: ManagedResource,
    /// Resources that must exist, in apply order
    pub apply: Vec<ManagedResource>,
    /// Resources of disabled components that must not exist
    pub remove: Vec<ManagedResource>,
}

/// Everything a template needs, fixed for the duration of one pass
#[derive(Debug)]
pub(crate) struct RenderContext<'a> {
    pub(crate) primary_name: String,
    pub(crate) namespace: &'a str,
    pub(crate) effective: &'a EffectiveConfig,
    pub(crate) images: &'a ImageResolver<'a>,
    owner: OwnerReference,
}

impl<'a> RenderContext<'a> {
    fn new(
        primary: &'a MultiClusterEngine,
        effective: &'a EffectiveConfig,
        images: &'a ImageResolver<'a>,
    ) -> Result<Self, SynthesisError> {
        let owner = primary
            .controller_owner_ref(&())
            .map(|owner| OwnerReference {
                block_owner_deletion: Some(true),
                ..owner
            })
            .ok_or_else(|| SynthesisError::MissingOwnerIdentity {
                name: primary.name_any(),
            })?;
        Ok(Self {
            primary_name: primary.name_any(),
            namespace: primary.target_namespace(),
            effective,
            images,
            owner,
        })
    }

    /// Convert a raw manifest into a [`ManagedResource`] owned by the primary
    fn finish(
        &self,
        component: Option<ComponentName>,
        kind: ManagedKind,
        manifest: serde_json::Value,
    ) -> Result<ManagedResource, SynthesisError> {
        let mut object: DynamicObject =
            serde_json::from_value(manifest).map_err(|e| SynthesisError::InvalidManifest {
                kind: kind.kind(),
                name: "<unparsable>".to_string(),
                reason: e.to_string(),
            })?;
        let name = object.name_any();
        let invalid = |reason: &str| SynthesisError::InvalidManifest {
            kind: kind.kind(),
            name: name.clone(),
            reason: reason.to_string(),
        };

        if object.types.as_ref().map(|t| t.kind.as_str()) != Some(kind.kind()) {
            return Err(invalid("kind does not match"));
        }
        if name.is_empty() {
            return Err(invalid("missing name"));
        }
        if kind.namespaced() != object.metadata.namespace.is_some() {
            return Err(invalid("namespace does not match scope"));
        }

        object.metadata.owner_references = Some(vec![self.owner.clone()]);
        let labels = object.metadata.labels.get_or_insert_with(BTreeMap::new);
        labels.insert(LABEL_BACKPLANE_NAME.to_string(), self.primary_name.clone());
        labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
        labels.insert(
            LABEL_COMPONENT.to_string(),
            component.map_or(CORE_COMPONENT, |c| c.as_str()).to_string(),
        );

        Ok(ManagedResource {
            component,
            kind,
            object,
        })
    }

    /// `nodePlacement` block for foreign operators that accept one
    fn node_placement(&self) -> serde_json::Value {
        let mut placement = serde_json::Map::new();
        if !self.effective.node_selector.is_empty() {
            placement.insert(
                "nodeSelector".to_string(),
                serde_json::json!(self.effective.node_selector),
            );
        }
        if !self.effective.tolerations.is_empty() {
            placement.insert(
                "tolerations".to_string(),
                serde_json::json!(self.effective.tolerations),
            );
        }
        serde_json::Value::Object(placement)
    }
}

/// Render every resource implied by `primary` and its effective configuration
pub fn synthesize(
    effective: &EffectiveConfig,
    images: &ImageResolver<'_>,
    primary: &MultiClusterEngine,
) -> Result<DesiredState, SynthesisError> {
    let ctx = RenderContext::new(primary, effective, images)?;

    let mut desired = DesiredState {
        namespace: components::namespace(&ctx)?,
        apply: components::core(&ctx)?,
        remove: Vec::new(),
    };
    for component in ComponentName::ALL {
        let rendered = components::render(&ctx, component)?;
        if effective.is_enabled(component) {
            desired.apply.extend(rendered);
        } else {
            desired.remove.extend(rendered);
        }
    }
    Ok(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::images::{ImageDefaults, ImagePins};
    use crate::controller::overrides;
    use crate::crd::{ComponentConfig, ImagePullPolicy, MultiClusterEngineSpec, Overrides};
    use k8s_openapi::api::core::v1::Toleration;

    fn primary(spec: MultiClusterEngineSpec) -> MultiClusterEngine {
        let mut mce = MultiClusterEngine::new("multiclusterengine", spec);
        mce.metadata.uid = Some("6a1d2f7e-0000-4000-8000-000000000001".to_string());
        mce
    }

    fn defaults() -> ImageDefaults {
        ImageDefaults::from_lookup(|_| Some("quay.io/test/test:test".to_string())).unwrap()
    }

    fn render(mce: &MultiClusterEngine, repository: Option<&str>, pins: &ImagePins) -> DesiredState {
        let defaults = defaults();
        let resolver = ImageResolver::new(&defaults, repository, pins);
        let effective = overrides::resolve(&mce.spec).effective;
        synthesize(&effective, &resolver, mce).unwrap()
    }

    fn containers(resource: &ManagedResource) -> Vec<serde_json::Value> {
        resource.object.data["spec"]["template"]["spec"]["containers"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    fn deployments(desired: &DesiredState) -> impl Iterator<Item = &ManagedResource> {
        desired
            .apply
            .iter()
            .filter(|r| r.kind == ManagedKind::Deployment)
    }

    #[test]
    fn test_every_resource_has_exactly_one_controller_owner() {
        let mce = primary(MultiClusterEngineSpec::default());
        let desired = render(&mce, None, &ImagePins::empty());
        assert!(!desired.apply.is_empty());

        for resource in desired.apply.iter().chain(desired.remove.iter()) {
            let owners = resource.object.metadata.owner_references.as_ref().unwrap();
            assert_eq!(owners.len(), 1, "{}", resource.key());
            assert_eq!(owners[0].name, "multiclusterengine");
            assert_eq!(owners[0].controller, Some(true));
            assert_eq!(owners[0].block_owner_deletion, Some(true));
        }
        assert!(mce.metadata.owner_references.is_none());
    }

    #[test]
    fn test_missing_uid_is_a_synthesis_error() {
        let mce = MultiClusterEngine::new("multiclusterengine", MultiClusterEngineSpec::default());
        let defaults = defaults();
        let pins = ImagePins::empty();
        let resolver = ImageResolver::new(&defaults, None, &pins);
        let effective = overrides::resolve(&mce.spec).effective;
        let err = synthesize(&effective, &resolver, &mce).unwrap_err();
        assert!(matches!(err, SynthesisError::MissingOwnerIdentity { .. }));
    }

    #[test]
    fn test_default_pull_policy_on_every_container() {
        let desired = render(&primary(MultiClusterEngineSpec::default()), None, &ImagePins::empty());
        for deployment in deployments(&desired) {
            for container in containers(deployment) {
                assert_eq!(container["imagePullPolicy"], "IfNotPresent");
            }
        }
    }

    #[test]
    fn test_pull_policy_override_on_every_container() {
        let spec = MultiClusterEngineSpec {
            overrides: Some(Overrides {
                image_pull_policy: Some(ImagePullPolicy::Always),
                components: vec![ComponentConfig::new(ComponentName::ManagedServiceAccount, true)],
            }),
            ..Default::default()
        };
        let desired = render(&primary(spec), None, &ImagePins::empty());
        let mut seen = 0;
        for deployment in deployments(&desired) {
            for container in containers(deployment) {
                assert_eq!(container["imagePullPolicy"], "Always");
                seen += 1;
            }
        }
        assert!(seen >= 13);
    }

    #[test]
    fn test_repository_annotation_prefixes_every_image() {
        let desired = render(
            &primary(MultiClusterEngineSpec::default()),
            Some("quay.io/testrepo"),
            &ImagePins::empty(),
        );
        for deployment in deployments(&desired) {
            for container in containers(deployment) {
                let image = container["image"].as_str().unwrap();
                assert!(image.starts_with("quay.io/testrepo"), "{image}");
            }
        }
    }

    #[test]
    fn test_config_map_pin_is_used_verbatim() {
        let digest = "sha256:9dc4d072dcd06eda3fda19a15f4b84677fbbbde2a476b4817272cde4724f02cc";
        let pins = ImagePins::from_json(
            "pins",
            &format!(
                r#"[{{"image-key":"discovery_operator","image-remote":"quay.io/stolostron","image-name":"discovery-operator","image-digest":"{digest}"}}]"#
            ),
        )
        .unwrap();
        let desired = render(&primary(MultiClusterEngineSpec::default()), None, &pins);
        let discovery = desired
            .apply
            .iter()
            .find(|r| r.name() == "discovery-operator")
            .unwrap();
        assert_eq!(
            containers(discovery)[0]["image"],
            format!("quay.io/stolostron/discovery-operator@{digest}")
        );
    }

    #[test]
    fn test_disabled_component_is_rendered_for_removal() {
        let spec = MultiClusterEngineSpec {
            overrides: Some(Overrides {
                image_pull_policy: None,
                components: vec![
                    ComponentConfig::new(ComponentName::Discovery, true),
                    ComponentConfig::new(ComponentName::Discovery, false),
                ],
            }),
            ..Default::default()
        };
        let desired = render(&primary(spec), None, &ImagePins::empty());
        assert!(desired.apply.iter().all(|r| r.name() != "discovery-operator"));
        assert!(desired.remove.iter().any(|r| r.name() == "discovery-operator"));
        // Managed service account is off by default
        assert!(desired
            .remove
            .iter()
            .any(|r| r.name() == "managed-serviceaccount-addon-manager"));
    }

    #[test]
    fn test_managed_service_account_resources() {
        let spec = MultiClusterEngineSpec {
            overrides: Some(Overrides {
                image_pull_policy: None,
                components: vec![ComponentConfig::new(ComponentName::ManagedServiceAccount, true)],
            }),
            ..Default::default()
        };
        let desired = render(&primary(spec), None, &ImagePins::empty());
        let keys: Vec<String> = desired.apply.iter().map(ManagedResource::key).collect();
        for expected in [
            "Deployment/multicluster-engine/managed-serviceaccount-addon-manager",
            "ServiceAccount/multicluster-engine/managed-serviceaccount",
            "CustomResourceDefinition/managedserviceaccounts.authentication.open-cluster-management.io",
            "ClusterManagementAddOn/managed-serviceaccount",
        ] {
            assert!(keys.iter().any(|k| k == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_placement_and_labels() {
        let spec = MultiClusterEngineSpec {
            target_namespace: "backplane".to_string(),
            image_pull_secret: Some("pull-secret".to_string()),
            node_selector: [("node-role.kubernetes.io/infra".to_string(), String::new())].into(),
            tolerations: vec![Toleration {
                key: Some("node-role.kubernetes.io/infra".to_string()),
                operator: Some("Exists".to_string()),
                effect: Some("NoSchedule".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let desired = render(&primary(spec), None, &ImagePins::empty());

        for resource in &desired.apply {
            let labels = resource.object.metadata.labels.as_ref().unwrap();
            assert_eq!(labels[LABEL_BACKPLANE_NAME], "multiclusterengine");
            assert_eq!(labels[LABEL_MANAGED_BY], MANAGED_BY_VALUE);
            match (resource.kind, resource.namespace()) {
                (ManagedKind::ServiceMonitor, ns) => assert_eq!(ns.as_deref(), Some("openshift-monitoring")),
                (kind, ns) if kind.namespaced() => assert_eq!(ns.as_deref(), Some("backplane")),
                (_, ns) => assert_eq!(ns, None),
            }
        }
        for deployment in deployments(&desired) {
            let pod = &deployment.object.data["spec"]["template"]["spec"];
            assert_eq!(pod["imagePullSecrets"][0]["name"], "pull-secret");
            assert_eq!(pod["tolerations"][0]["operator"], "Exists");
            assert!(pod["nodeSelector"].is_object());
            assert_eq!(deployment.object.data["spec"]["replicas"], 2);
        }
    }

    #[test]
    fn test_pods_reference_only_rendered_service_accounts() {
        let spec = MultiClusterEngineSpec {
            overrides: Some(Overrides {
                image_pull_policy: None,
                components: vec![ComponentConfig::new(ComponentName::ManagedServiceAccount, true)],
            }),
            ..Default::default()
        };
        let desired = render(&primary(spec), None, &ImagePins::empty());
        let service_accounts: Vec<String> = desired
            .apply
            .iter()
            .filter(|r| r.kind == ManagedKind::ServiceAccount)
            .map(ManagedResource::name)
            .collect();

        for deployment in deployments(&desired) {
            let account = deployment.object.data["spec"]["template"]["spec"]["serviceAccountName"]
                .as_str()
                .unwrap();
            assert!(
                service_accounts.iter().any(|sa| sa == account),
                "{} runs as unrendered {account}",
                deployment.key()
            );
        }
    }

    #[test]
    fn test_service_monitor_selects_a_rendered_service() {
        let desired = render(&primary(MultiClusterEngineSpec::default()), None, &ImagePins::empty());
        let monitor = desired
            .apply
            .iter()
            .find(|r| r.kind == ManagedKind::ServiceMonitor)
            .unwrap();
        let selector = &monitor.object.data["spec"]["selector"]["matchLabels"]["app"];

        let service = desired
            .apply
            .iter()
            .find(|r| r.kind == ManagedKind::Service)
            .unwrap();
        let labels = service.object.metadata.labels.as_ref().unwrap();
        assert_eq!(selector.as_str(), labels.get("app").map(String::as_str));
        assert_eq!(service.object.data["spec"]["ports"][0]["name"], "https");
    }

    #[test]
    fn test_trusted_ca_bundle_is_always_rendered() {
        let spec = MultiClusterEngineSpec {
            overrides: Some(Overrides {
                image_pull_policy: None,
                components: ComponentName::ALL
                    .iter()
                    .map(|c| ComponentConfig::new(*c, false))
                    .collect(),
            }),
            ..Default::default()
        };
        let desired = render(&primary(spec), None, &ImagePins::empty());
        assert_eq!(desired.apply.len(), 1);
        assert_eq!(desired.apply[0].name(), "trusted-ca-bundle");
        assert_eq!(desired.namespace.key(), "Namespace/multicluster-engine");
        assert_eq!(
            desired.apply[0].object.metadata.labels.as_ref().unwrap()[LABEL_COMPONENT],
            CORE_COMPONENT
        );
    }
}
