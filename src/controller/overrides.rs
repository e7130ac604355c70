//! # Override Resolution
//!
//! Collapses `spec.overrides` into one [`EffectiveConfig`] per reconcile pass.
//!
//! The component list may name the same component several times. Entries are
//! applied in order, so the last occurrence decides. Components that are never
//! named keep their compiled-in default. The stored list is rewritten to one
//! entry per name, but only when that changes it.

use crate::crd::{ComponentConfig, ComponentName, ImagePullPolicy, MultiClusterEngineSpec};
use k8s_openapi::api::core::v1::Toleration;
use std::collections::BTreeMap;

/// Deduplicated, fully resolved view of a MultiClusterEngine spec
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    components: BTreeMap<ComponentName, bool>,
    pub image_pull_policy: ImagePullPolicy,
    pub image_pull_secret: Option<String>,
    pub replicas: i32,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
}

impl EffectiveConfig {
    #[must_use]
    pub fn is_enabled(&self, component: ComponentName) -> bool {
        self.components
            .get(&component)
            .copied()
            .unwrap_or_else(|| component.enabled_by_default())
    }

    /// Exactly one entry per known component
    pub fn components(&self) -> impl Iterator<Item = (ComponentName, bool)> + '_ {
        self.components.iter().map(|(name, enabled)| (*name, *enabled))
    }
}

/// Outcome of resolving a spec
#[derive(Debug, Clone)]
pub struct OverrideResolution {
    pub effective: EffectiveConfig,
    /// One entry per named component, first-appearance order, last value
    pub deduplicated: Vec<ComponentConfig>,
    /// True when `deduplicated` differs from the stored list
    pub needs_write: bool,
}

/// Resolve a spec into its effective configuration
#[must_use]
pub fn resolve(spec: &MultiClusterEngineSpec) -> OverrideResolution {
    let raw = spec
        .overrides
        .as_ref()
        .map_or(&[][..], |o| o.components.as_slice());
    let (components, deduplicated) = resolve_components(raw);
    let needs_write = deduplicated.as_slice() != raw;

    let image_pull_policy = spec
        .overrides
        .as_ref()
        .and_then(|o| o.image_pull_policy)
        .unwrap_or_default();

    OverrideResolution {
        effective: EffectiveConfig {
            components,
            image_pull_policy,
            image_pull_secret: spec.image_pull_secret.clone().filter(|s| !s.is_empty()),
            replicas: spec.availability_config.replicas(),
            node_selector: spec.node_selector.clone(),
            tolerations: spec.tolerations.clone(),
        },
        deduplicated,
        needs_write,
    }
}

/// Apply an ordered override list on top of the defaults
///
/// Returns the enablement map and the deduplicated override list.
#[must_use]
pub fn resolve_components(
    raw: &[ComponentConfig],
) -> (BTreeMap<ComponentName, bool>, Vec<ComponentConfig>) {
    let mut components: BTreeMap<ComponentName, bool> = ComponentName::ALL
        .iter()
        .map(|c| (*c, c.enabled_by_default()))
        .collect();
    let mut deduplicated: Vec<ComponentConfig> = Vec::with_capacity(raw.len());

    for entry in raw {
        components.insert(entry.name, entry.enabled);
        match deduplicated.iter_mut().find(|c| c.name == entry.name) {
            Some(existing) => existing.enabled = entry.enabled,
            None => deduplicated.push(entry.clone()),
        }
    }

    (components, deduplicated)
}
