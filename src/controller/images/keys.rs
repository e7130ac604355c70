//! # Image Keys
//!
//! Logical names of every operand image the operator can deploy.

use crate::constants::OPERAND_IMAGE_ENV_PREFIX;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageKey {
    MulticloudManager,
    ManagedclusterImportController,
    RegistrationOperator,
    Registration,
    Work,
    Placement,
    AddonManager,
    OpenshiftHive,
    DiscoveryOperator,
    ClusterCuratorController,
    ClusterclaimsController,
    ProviderCredentialController,
    ClusterlifecycleStateMetrics,
    KubeRbacProxy,
    AssistedService,
    ManagedServiceaccount,
}

impl ImageKey {
    pub const ALL: [ImageKey; 16] = [
        ImageKey::MulticloudManager,
        ImageKey::ManagedclusterImportController,
        ImageKey::RegistrationOperator,
        ImageKey::Registration,
        ImageKey::Work,
        ImageKey::Placement,
        ImageKey::AddonManager,
        ImageKey::OpenshiftHive,
        ImageKey::DiscoveryOperator,
        ImageKey::ClusterCuratorController,
        ImageKey::ClusterclaimsController,
        ImageKey::ProviderCredentialController,
        ImageKey::ClusterlifecycleStateMetrics,
        ImageKey::KubeRbacProxy,
        ImageKey::AssistedService,
        ImageKey::ManagedServiceaccount,
    ];

    /// Key as written in the `image-key` field of a pin entry
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKey::MulticloudManager => "multicloud_manager",
            ImageKey::ManagedclusterImportController => "managedcluster_import_controller",
            ImageKey::RegistrationOperator => "registration_operator",
            ImageKey::Registration => "registration",
            ImageKey::Work => "work",
            ImageKey::Placement => "placement",
            ImageKey::AddonManager => "addon_manager",
            ImageKey::OpenshiftHive => "openshift_hive",
            ImageKey::DiscoveryOperator => "discovery_operator",
            ImageKey::ClusterCuratorController => "cluster_curator_controller",
            ImageKey::ClusterclaimsController => "clusterclaims_controller",
            ImageKey::ProviderCredentialController => "provider_credential_controller",
            ImageKey::ClusterlifecycleStateMetrics => "clusterlifecycle_state_metrics",
            ImageKey::KubeRbacProxy => "kube_rbac_proxy",
            ImageKey::AssistedService => "assisted_service",
            ImageKey::ManagedServiceaccount => "managed_serviceaccount",
        }
    }

    /// Environment variable holding the default reference, e.g. `OPERAND_IMAGE_WORK`
    #[must_use]
    pub fn env_var(&self) -> String {
        format!(
            "{OPERAND_IMAGE_ENV_PREFIX}{}",
            self.as_str().to_ascii_uppercase()
        )
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_names() {
        assert_eq!(
            ImageKey::DiscoveryOperator.env_var(),
            "OPERAND_IMAGE_DISCOVERY_OPERATOR"
        );
        assert_eq!(ImageKey::Work.env_var(), "OPERAND_IMAGE_WORK");
    }

    #[test]
    fn test_keys_are_unique() {
        let mut names: Vec<_> = ImageKey::ALL.iter().map(ImageKey::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ImageKey::ALL.len());
    }
}
