//! # Status
//!
//! Observes managed resources and derives the engine status from them.

mod conditions;
mod observe;

pub use conditions::{
    aggregate, AggregatedStatus, Health, CONDITION_AVAILABLE, CONDITION_DEGRADED,
    CONDITION_PROGRESSING,
};
pub use observe::{assess, observe, ObservedResource, ResourceState};
