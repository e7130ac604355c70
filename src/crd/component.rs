//! # Components
//!
//! The closed set of optional backplane components and their default enablement.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A known backplane component
///
/// Override entries can only name one of these; anything else is rejected by
/// the CRD schema before it reaches the operator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    schemars::JsonSchema,
)]
pub enum ComponentName {
    #[serde(rename = "assisted-service")]
    AssistedService,
    #[serde(rename = "cluster-lifecycle")]
    ClusterLifecycle,
    #[serde(rename = "cluster-manager")]
    ClusterManager,
    #[serde(rename = "discovery")]
    Discovery,
    #[serde(rename = "hive")]
    Hive,
    #[serde(rename = "server-foundation")]
    ServerFoundation,
    #[serde(rename = "managedserviceaccount-preview")]
    ManagedServiceAccount,
}

impl ComponentName {
    /// Every known component, in rendering order
    pub const ALL: [ComponentName; 7] = [
        ComponentName::ServerFoundation,
        ComponentName::ClusterManager,
        ComponentName::Hive,
        ComponentName::Discovery,
        ComponentName::ClusterLifecycle,
        ComponentName::AssistedService,
        ComponentName::ManagedServiceAccount,
    ];

    /// Serialized name, as written in `spec.overrides.components[].name`
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentName::AssistedService => "assisted-service",
            ComponentName::ClusterLifecycle => "cluster-lifecycle",
            ComponentName::ClusterManager => "cluster-manager",
            ComponentName::Discovery => "discovery",
            ComponentName::Hive => "hive",
            ComponentName::ServerFoundation => "server-foundation",
            ComponentName::ManagedServiceAccount => "managedserviceaccount-preview",
        }
    }

    /// Enablement used when no override names this component
    #[must_use]
    pub fn enabled_by_default(&self) -> bool {
        !matches!(self, ComponentName::ManagedServiceAccount)
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `spec.overrides.components`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ComponentConfig {
    pub name: ComponentName,
    pub enabled: bool,
}

impl ComponentConfig {
    #[must_use]
    pub fn new(name: ComponentName, enabled: bool) -> Self {
        Self { name, enabled }
    }
}
