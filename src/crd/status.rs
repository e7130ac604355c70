//! # MultiClusterEngine Status
//!
//! Status types published on the status subresource.

use serde::{Deserialize, Serialize};

/// Status of the MultiClusterEngine resource
///
/// Every field is derived by the operator on each pass. Nothing here is
/// time-varying except `lastTransitionTime`, which only moves when a
/// condition flips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MultiClusterEngineStatus {
    /// Summary phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Available, Progressing and Degraded conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Per managed resource readiness
    #[serde(default)]
    pub components: Vec<ComponentStatus>,
    /// Generation of the spec this status was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Summary phase of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum Phase {
    Available,
    Progressing,
    Error,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Available => "Available",
            Phase::Progressing => "Progressing",
            Phase::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Readiness of a single managed resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// Resource name
    pub name: String,
    /// Resource kind
    pub kind: String,
    /// "True" when ready
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
