//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use backplane_operator::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (`MultiClusterEngine`, `ComponentName`, etc.)
//! - Reconciler types (`Reconciler`, `ReconcilerError`, `ClusterOps`)
//! - Image resolution and desired-state types
//! - Config types (`ControllerConfig`, `ServerConfig`)

pub use crate::crd::*;

pub use crate::controller::reconciler::{
    reconcile, BackoffState, ClusterOps, KubeCluster, Reconciler, ReconcilerError,
};

pub use crate::controller::images::{ImageDefaults, ImageError, ImageKey, ImagePins, ImageResolver};
pub use crate::controller::overrides::{resolve, EffectiveConfig};
pub use crate::controller::render::{synthesize, DesiredState, ManagedKind, ManagedResource, SynthesisError};

pub use crate::config::{
    ControllerConfig, ServerConfig, SharedControllerConfig, SharedServerConfig,
};
