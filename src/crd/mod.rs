//! # Custom Resource Definitions
//!
//! CRD types for the backplane operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - MultiClusterEngine specification, overrides and pod placement
//! - `component.rs` - Closed set of backplane components
//! - `status.rs` - Status, conditions and per-resource readiness

mod component;
mod spec;
mod status;

pub use component::{ComponentConfig, ComponentName};
pub use spec::{
    AvailabilityType, ImagePullPolicy, MultiClusterEngine, MultiClusterEngineSpec, Overrides,
};
pub use status::{ComponentStatus, Condition, MultiClusterEngineStatus, Phase};
