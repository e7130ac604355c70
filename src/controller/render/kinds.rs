//! # Managed Kinds
//!
//! Every resource kind the operator creates, with the API coordinates needed to
//! apply, read, delete and watch it as a [`DynamicObject`].

use crate::crd::ComponentName;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::ResourceExt;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManagedKind {
    Namespace,
    ConfigMap,
    ServiceAccount,
    Service,
    Deployment,
    CustomResourceDefinition,
    ServiceMonitor,
    ClusterManager,
    HiveConfig,
    ClusterManagementAddOn,
}

impl ManagedKind {
    pub const ALL: [ManagedKind; 10] = [
        ManagedKind::Namespace,
        ManagedKind::ConfigMap,
        ManagedKind::ServiceAccount,
        ManagedKind::Service,
        ManagedKind::Deployment,
        ManagedKind::CustomResourceDefinition,
        ManagedKind::ServiceMonitor,
        ManagedKind::ClusterManager,
        ManagedKind::HiveConfig,
        ManagedKind::ClusterManagementAddOn,
    ];

    /// (group, version, kind, plural)
    fn coordinates(self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            ManagedKind::Namespace => ("", "v1", "Namespace", "namespaces"),
            ManagedKind::ConfigMap => ("", "v1", "ConfigMap", "configmaps"),
            ManagedKind::ServiceAccount => ("", "v1", "ServiceAccount", "serviceaccounts"),
            ManagedKind::Service => ("", "v1", "Service", "services"),
            ManagedKind::Deployment => ("apps", "v1", "Deployment", "deployments"),
            ManagedKind::CustomResourceDefinition => (
                "apiextensions.k8s.io",
                "v1",
                "CustomResourceDefinition",
                "customresourcedefinitions",
            ),
            ManagedKind::ServiceMonitor => {
                ("monitoring.coreos.com", "v1", "ServiceMonitor", "servicemonitors")
            }
            ManagedKind::ClusterManager => (
                "operator.open-cluster-management.io",
                "v1",
                "ClusterManager",
                "clustermanagers",
            ),
            ManagedKind::HiveConfig => ("hive.openshift.io", "v1", "HiveConfig", "hiveconfigs"),
            ManagedKind::ClusterManagementAddOn => (
                "addon.open-cluster-management.io",
                "v1alpha1",
                "ClusterManagementAddOn",
                "clustermanagementaddons",
            ),
        }
    }

    #[must_use]
    pub fn kind(self) -> &'static str {
        self.coordinates().2
    }

    #[must_use]
    pub fn gvk(self) -> GroupVersionKind {
        let (group, version, kind, _) = self.coordinates();
        GroupVersionKind::gvk(group, version, kind)
    }

    #[must_use]
    pub fn api_resource(self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk(), self.coordinates().3)
    }

    #[must_use]
    pub fn namespaced(self) -> bool {
        matches!(
            self,
            ManagedKind::ConfigMap
                | ManagedKind::ServiceAccount
                | ManagedKind::Service
                | ManagedKind::Deployment
                | ManagedKind::ServiceMonitor
        )
    }

    /// Kinds served by other operators' CRDs, which may be absent from the cluster
    #[must_use]
    pub fn is_foreign(self) -> bool {
        matches!(
            self,
            ManagedKind::ServiceMonitor
                | ManagedKind::ClusterManager
                | ManagedKind::HiveConfig
                | ManagedKind::ClusterManagementAddOn
        )
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// One desired object together with its kind and owning component
#[derive(Debug, Clone)]
pub struct ManagedResource {
    /// `None` for always-on resources
    pub component: Option<ComponentName>,
    pub kind: ManagedKind,
    pub object: DynamicObject,
}

impl ManagedResource {
    #[must_use]
    pub fn name(&self) -> String {
        self.object.name_any()
    }

    #[must_use]
    pub fn namespace(&self) -> Option<String> {
        self.object.namespace()
    }

    /// `Kind/namespace/name` or `Kind/name`, used in logs and status
    #[must_use]
    pub fn key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}/{}", self.kind, ns, self.name()),
            None => format!("{}/{}", self.kind, self.name()),
        }
    }
}
