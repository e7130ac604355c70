//! # Component Manifests
//!
//! The resources each backplane component consists of.

use super::workload::{deployment, ContainerTemplate};
use super::{ManagedKind, ManagedResource, RenderContext, SynthesisError};
use crate::constants::MONITORING_NAMESPACE;
use crate::controller::images::ImageKey;
use crate::crd::ComponentName;
use serde_json::json;

type Rendered = Result<Vec<ManagedResource>, SynthesisError>;

pub(super) fn namespace(ctx: &RenderContext<'_>) -> Result<ManagedResource, SynthesisError> {
    ctx.finish(
        None,
        ManagedKind::Namespace,
        json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": ctx.namespace},
        }),
    )
}

/// Resources present regardless of component enablement
pub(super) fn core(ctx: &RenderContext<'_>) -> Rendered {
    Ok(vec![ctx.finish(
        None,
        ManagedKind::ConfigMap,
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "trusted-ca-bundle",
                "namespace": ctx.namespace,
                "labels": {"config.openshift.io/inject-trusted-cabundle": "true"},
            },
        }),
    )?])
}

/// Render a component, giving every Deployment the ServiceAccount its pods run as
pub(super) fn render(ctx: &RenderContext<'_>, component: ComponentName) -> Rendered {
    let rendered = match component {
        ComponentName::ServerFoundation => server_foundation(ctx)?,
        ComponentName::ClusterManager => cluster_manager(ctx)?,
        ComponentName::Hive => hive(ctx)?,
        ComponentName::Discovery => discovery(ctx)?,
        ComponentName::ClusterLifecycle => cluster_lifecycle(ctx)?,
        ComponentName::AssistedService => assisted_service(ctx)?,
        ComponentName::ManagedServiceAccount => managed_service_account(ctx)?,
    };
    if rendered.is_empty() {
        return Err(SynthesisError::NoManifests { component });
    }

    let mut resources = Vec::with_capacity(rendered.len() * 2);
    for resource in rendered {
        if resource.kind == ManagedKind::Deployment {
            resources.push(service_account(ctx, Some(component), &resource.name())?);
        }
        resources.push(resource);
    }
    Ok(resources)
}

fn service_account(
    ctx: &RenderContext<'_>,
    component: Option<ComponentName>,
    name: &str,
) -> Result<ManagedResource, SynthesisError> {
    ctx.finish(
        component,
        ManagedKind::ServiceAccount,
        json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": {"name": name, "namespace": ctx.namespace},
        }),
    )
}

fn server_foundation(ctx: &RenderContext<'_>) -> Rendered {
    let c = Some(ComponentName::ServerFoundation);
    let agent_image = ctx.images.resolve(ImageKey::MulticloudManager);
    Ok(vec![
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "ocm-controller",
                vec![ContainerTemplate::new("ocm-controller", ImageKey::MulticloudManager)
                    .args(&["/controller", "--enable-rbac=true"])
                    .arg(format!("--agent-image-name={agent_image}"))],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "ocm-webhook",
                vec![ContainerTemplate::new("ocm-webhook", ImageKey::MulticloudManager)
                    .args(&["/webhook", "--tls-cert-file=/var/run/ocm-webhook/tls.crt"])],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "ocm-proxyserver",
                vec![ContainerTemplate::new("ocm-proxyserver", ImageKey::MulticloudManager)
                    .args(&["/proxyserver", "--secure-port=6443"])],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "managedcluster-import-controller-v2",
                vec![ContainerTemplate::new(
                    "managedcluster-import-controller",
                    ImageKey::ManagedclusterImportController,
                )
                .env(
                    "REGISTRATION_OPERATOR_IMAGE",
                    ctx.images.resolve(ImageKey::RegistrationOperator),
                )
                .env("REGISTRATION_IMAGE", ctx.images.resolve(ImageKey::Registration))
                .env("WORK_IMAGE", ctx.images.resolve(ImageKey::Work))],
            )?,
        )?,
        addon(ctx, c, "work-manager", "Work Manager", "Handles endpoint work on managed clusters")?,
    ])
}

fn cluster_manager(ctx: &RenderContext<'_>) -> Rendered {
    let c = Some(ComponentName::ClusterManager);
    let placement = ctx.node_placement();
    Ok(vec![
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "cluster-manager",
                vec![ContainerTemplate::new("registration-operator", ImageKey::RegistrationOperator)
                    .args(&["/registration-operator", "hub"])],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::ClusterManager,
            json!({
                "apiVersion": "operator.open-cluster-management.io/v1",
                "kind": "ClusterManager",
                "metadata": {"name": "cluster-manager"},
                "spec": {
                    "registrationImagePullSpec": ctx.images.resolve(ImageKey::Registration),
                    "workImagePullSpec": ctx.images.resolve(ImageKey::Work),
                    "placementImagePullSpec": ctx.images.resolve(ImageKey::Placement),
                    "addOnManagerImagePullSpec": ctx.images.resolve(ImageKey::AddonManager),
                    "nodePlacement": placement,
                },
            }),
        )?,
    ])
}

fn hive(ctx: &RenderContext<'_>) -> Rendered {
    let c = Some(ComponentName::Hive);
    Ok(vec![
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "hive-operator",
                vec![ContainerTemplate::new("hive-operator", ImageKey::OpenshiftHive)
                    .args(&["--log-level", "info"])
                    .env("HIVE_OPERATOR_NS", ctx.namespace)],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::HiveConfig,
            json!({
                "apiVersion": "hive.openshift.io/v1",
                "kind": "HiveConfig",
                "metadata": {"name": "hive"},
                "spec": {"targetNamespace": "hive"},
            }),
        )?,
    ])
}

fn discovery(ctx: &RenderContext<'_>) -> Rendered {
    Ok(vec![ctx.finish(
        Some(ComponentName::Discovery),
        ManagedKind::Deployment,
        deployment(
            ctx,
            "discovery-operator",
            vec![ContainerTemplate::new("discovery-operator", ImageKey::DiscoveryOperator)
                .args(&["--leader-elect"])],
        )?,
    )?])
}

fn cluster_lifecycle(ctx: &RenderContext<'_>) -> Rendered {
    let c = Some(ComponentName::ClusterLifecycle);
    let metrics = "clusterlifecycle-state-metrics-v2";
    Ok(vec![
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "cluster-curator-controller",
                vec![ContainerTemplate::new(
                    "cluster-curator-controller",
                    ImageKey::ClusterCuratorController,
                )
                .args(&["./manager"])],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "clusterclaims-controller",
                vec![ContainerTemplate::new(
                    "clusterclaims-controller",
                    ImageKey::ClusterclaimsController,
                )],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "provider-credential-controller",
                vec![ContainerTemplate::new(
                    "provider-credential-controller",
                    ImageKey::ProviderCredentialController,
                )],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                metrics,
                vec![
                    ContainerTemplate::new(metrics, ImageKey::ClusterlifecycleStateMetrics)
                        .args(&["--http-port=8080", "--http-telemetry-port=8081"]),
                    ContainerTemplate::new("kube-rbac-proxy", ImageKey::KubeRbacProxy).args(&[
                        "--secure-listen-address=0.0.0.0:8443",
                        "--upstream=http://127.0.0.1:8080/",
                    ]),
                ],
            )?,
        )?,
        ctx.finish(
            c,
            ManagedKind::Service,
            json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {
                    "name": metrics,
                    "namespace": ctx.namespace,
                    "labels": {"app": metrics},
                },
                "spec": {
                    "selector": {"app": metrics},
                    "ports": [{"name": "https", "port": 8443, "targetPort": 8443}],
                },
            }),
        )?,
        ctx.finish(
            c,
            ManagedKind::ServiceMonitor,
            json!({
                "apiVersion": "monitoring.coreos.com/v1",
                "kind": "ServiceMonitor",
                "metadata": {"name": metrics, "namespace": MONITORING_NAMESPACE},
                "spec": {
                    "endpoints": [{
                        "port": "https",
                        "scheme": "https",
                        "path": "/metrics",
                        "bearerTokenFile": "/var/run/secrets/kubernetes.io/serviceaccount/token",
                        "tlsConfig": {
                            "serverName": format!("{metrics}.{}.svc", ctx.namespace),
                        },
                    }],
                    "namespaceSelector": {"matchNames": [ctx.namespace]},
                    "selector": {"matchLabels": {"app": metrics}},
                },
            }),
        )?,
    ])
}

fn assisted_service(ctx: &RenderContext<'_>) -> Rendered {
    Ok(vec![ctx.finish(
        Some(ComponentName::AssistedService),
        ManagedKind::Deployment,
        deployment(
            ctx,
            "infrastructure-operator",
            vec![ContainerTemplate::new("manager", ImageKey::AssistedService)
                .args(&["--leader-elect"])
                .env("SERVICE_IMAGE", ctx.images.resolve(ImageKey::AssistedService))],
        )?,
    )?])
}

fn managed_service_account(ctx: &RenderContext<'_>) -> Rendered {
    let c = Some(ComponentName::ManagedServiceAccount);
    let name = "managed-serviceaccount";
    Ok(vec![
        ctx.finish(
            c,
            ManagedKind::CustomResourceDefinition,
            json!({
                "apiVersion": "apiextensions.k8s.io/v1",
                "kind": "CustomResourceDefinition",
                "metadata": {"name": "managedserviceaccounts.authentication.open-cluster-management.io"},
                "spec": {
                    "group": "authentication.open-cluster-management.io",
                    "names": {
                        "kind": "ManagedServiceAccount",
                        "listKind": "ManagedServiceAccountList",
                        "plural": "managedserviceaccounts",
                        "singular": "managedserviceaccount",
                    },
                    "scope": "Namespaced",
                    "versions": [{
                        "name": "v1alpha1",
                        "served": true,
                        "storage": true,
                        "subresources": {"status": {}},
                        "schema": {"openAPIV3Schema": {
                            "type": "object",
                            "x-kubernetes-preserve-unknown-fields": true,
                        }},
                    }],
                },
            }),
        )?,
        ctx.finish(
            c,
            ManagedKind::ServiceAccount,
            json!({
                "apiVersion": "v1",
                "kind": "ServiceAccount",
                "metadata": {"name": name, "namespace": ctx.namespace},
            }),
        )?,
        ctx.finish(
            c,
            ManagedKind::Deployment,
            deployment(
                ctx,
                "managed-serviceaccount-addon-manager",
                vec![ContainerTemplate::new("manager", ImageKey::ManagedServiceaccount)
                    .args(&["./msa", "manager", "--leader-elect=true"])
                    .arg(format!(
                        "--agent-image-name={}",
                        ctx.images.resolve(ImageKey::ManagedServiceaccount)
                    ))],
            )?,
        )?,
        addon(
            ctx,
            c,
            name,
            "Managed ServiceAccount Addon",
            "Synchronizes service accounts to managed clusters",
        )?,
    ])
}

fn addon(
    ctx: &RenderContext<'_>,
    component: Option<ComponentName>,
    name: &str,
    display_name: &str,
    description: &str,
) -> Result<ManagedResource, SynthesisError> {
    ctx.finish(
        component,
        ManagedKind::ClusterManagementAddOn,
        json!({
            "apiVersion": "addon.open-cluster-management.io/v1alpha1",
            "kind": "ClusterManagementAddOn",
            "metadata": {"name": name},
            "spec": {"addOnMeta": {"displayName": display_name, "description": description}},
        }),
    )
}
