//! # MultiClusterEngine Spec
//!
//! Main CRD specification types and default values.

use crate::crd::ComponentConfig;
use k8s_openapi::api::core::v1::Toleration;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// MultiClusterEngine Custom Resource Definition
///
/// Declares the desired state of one multicluster engine installation. The
/// operator derives every backplane workload, configuration object and
/// foreign custom resource from this single object.
///
/// # Example
///
/// ```yaml
/// apiVersion: multicluster.openshift.io/v1
/// kind: MultiClusterEngine
/// metadata:
///   name: multiclusterengine
///   annotations:
///     imageOverridesCM: mce-image-pins
/// spec:
///   targetNamespace: multicluster-engine
///   imagePullSecret: pull-secret
///   overrides:
///     imagePullPolicy: Always
///     components:
///       - name: discovery
///         enabled: false
///       - name: managedserviceaccount-preview
///         enabled: true
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "MultiClusterEngine",
    group = "multicluster.openshift.io",
    version = "v1",
    status = "crate::crd::MultiClusterEngineStatus",
    shortname = "mce",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Available", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Available\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MultiClusterEngineSpec {
    /// Namespace where operand workloads are installed
    /// Empty selects `multicluster-engine`
    #[serde(default)]
    pub target_namespace: String,
    /// Name of a pull secret added to every operand pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret: Option<String>,
    /// Replica profile for operand workloads
    #[serde(default)]
    pub availability_config: AvailabilityType,
    /// Node selector copied into every operand pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    /// Tolerations copied into every operand pod
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    /// Component enablement and pull policy overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Overrides>,
}

/// Replica profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum AvailabilityType {
    /// Two replicas per workload
    #[default]
    High,
    /// One replica per workload
    Basic,
}

impl AvailabilityType {
    #[must_use]
    pub fn replicas(self) -> i32 {
        match self {
            AvailabilityType::High => 2,
            AvailabilityType::Basic => 1,
        }
    }
}

/// Container image pull policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ImagePullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

impl ImagePullPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImagePullPolicy::Always => "Always",
            ImagePullPolicy::IfNotPresent => "IfNotPresent",
            ImagePullPolicy::Never => "Never",
        }
    }
}

/// `spec.overrides`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    /// Pull policy for every operand container; unset selects `IfNotPresent`
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_pull_policy: Option<ImagePullPolicy>,
    /// Ordered component enablement entries; later entries win
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

/// Treat `""` the same as an absent pull policy
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<ImagePullPolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => serde_json::from_value(serde_json::Value::String(value.to_string()))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl MultiClusterEngine {
    /// Namespace where operand workloads land
    #[must_use]
    pub fn target_namespace(&self) -> &str {
        if self.spec.target_namespace.is_empty() {
            crate::constants::DEFAULT_TARGET_NAMESPACE
        } else {
            &self.spec.target_namespace
        }
    }

    /// Value of a metadata annotation, ignoring empty values
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Stored `spec.overrides.components`, empty when no overrides are set
    #[must_use]
    pub fn component_overrides(&self) -> &[ComponentConfig] {
        self.spec
            .overrides
            .as_ref()
            .map_or(&[], |o| o.components.as_slice())
    }
}
