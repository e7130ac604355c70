//! # Reconciler
//!
//! Core reconciliation logic for `MultiClusterEngine` resources.
//!
//! The reconciler:
//! - Deduplicates component overrides and persists the cleaned list
//! - Resolves operand images from pins, a repository override and defaults
//! - Renders the backplane resources and applies them with server-side apply
//! - Removes resources of disabled components that the engine controls
//! - Publishes Available, Progressing and Degraded conditions
//!
//! All Kubernetes access goes through [`ClusterOps`].

pub mod apply;
pub mod cluster;
pub mod reconcile;
pub mod status;
pub mod types;

pub use apply::{reconcile_resources, ApplyReport};
pub use cluster::{ClusterOps, KubeCluster};
pub use reconcile::reconcile;
pub use status::{aggregate, observe, AggregatedStatus, Health, ObservedResource, ResourceState};
pub use types::{BackoffState, Reconciler, ReconcilerError};
