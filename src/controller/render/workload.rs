//! # Workload Templates
//!
//! Builds operand Deployments with the effective pull policy, pull secret,
//! replica count and pod placement applied to every container.

use super::{RenderContext, SynthesisError};
use crate::controller::images::ImageKey;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, LocalObjectReference, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

/// One container of an operand Deployment
#[derive(Debug, Clone)]
pub(super) struct ContainerTemplate {
    name: &'static str,
    image: ImageKey,
    args: Vec<String>,
    env: Vec<(&'static str, String)>,
}

impl ContainerTemplate {
    pub(super) fn new(name: &'static str, image: ImageKey) -> Self {
        Self {
            name,
            image,
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub(super) fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(ToString::to_string));
        self
    }

    pub(super) fn arg(mut self, arg: String) -> Self {
        self.args.push(arg);
        self
    }

    pub(super) fn env(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.env.push((name, value.into()));
        self
    }
}

/// Render an operand Deployment in the target namespace
pub(super) fn deployment(
    ctx: &RenderContext<'_>,
    name: &str,
    containers: Vec<ContainerTemplate>,
) -> Result<serde_json::Value, SynthesisError> {
    if containers.is_empty() {
        return Err(SynthesisError::EmptyWorkload {
            name: name.to_string(),
        });
    }

    let selector: BTreeMap<String, String> = [("app".to_string(), name.to_string())].into();
    let pull_policy = ctx.effective.image_pull_policy.as_str().to_string();

    let containers = containers
        .into_iter()
        .map(|c| Container {
            name: c.name.to_string(),
            image: Some(ctx.images.resolve(c.image)),
            image_pull_policy: Some(pull_policy.clone()),
            args: (!c.args.is_empty()).then_some(c.args),
            env: (!c.env.is_empty()).then(|| {
                c.env
                    .into_iter()
                    .map(|(name, value)| EnvVar {
                        name: name.to_string(),
                        value: Some(value),
                        value_from: None,
                    })
                    .collect()
            }),
            ..Default::default()
        })
        .collect();

    let deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(ctx.namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(ctx.effective.replicas),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(name.to_string()),
                    containers,
                    image_pull_secrets: ctx.effective.image_pull_secret.as_ref().map(|secret| {
                        vec![LocalObjectReference {
                            name: secret.clone(),
                        }]
                    }),
                    node_selector: (!ctx.effective.node_selector.is_empty())
                        .then(|| ctx.effective.node_selector.clone()),
                    tolerations: (!ctx.effective.tolerations.is_empty())
                        .then(|| ctx.effective.tolerations.clone()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    serde_json::to_value(&deployment).map_err(|e| SynthesisError::Serialization {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
