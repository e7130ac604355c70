//! # Conditions
//!
//! Pure derivation of the engine status from observed resource states.

use super::observe::{ObservedResource, ResourceState};
use crate::crd::{ComponentStatus, Condition, MultiClusterEngineStatus, Phase};

pub const CONDITION_AVAILABLE: &str = "Available";
pub const CONDITION_PROGRESSING: &str = "Progressing";
pub const CONDITION_DEGRADED: &str = "Degraded";

/// Overall health of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Available,
    Progressing,
    Degraded,
}

impl Health {
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Health::Available => Phase::Available,
            Health::Progressing => Phase::Progressing,
            Health::Degraded => Phase::Error,
        }
    }
}

/// Result of aggregation, before it is stamped onto a status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedStatus {
    pub health: Health,
    pub reason: String,
    pub message: String,
    /// `None` keeps whatever component list the previous status carried
    pub components: Option<Vec<ComponentStatus>>,
}

impl AggregatedStatus {
    /// A pass that failed before resources could be observed
    #[must_use]
    pub fn failure(reason: &str, message: impl Into<String>) -> Self {
        Self {
            health: Health::Degraded,
            reason: reason.to_string(),
            message: message.into(),
            components: None,
        }
    }

    /// Stamp onto a status, preserving transition times of unchanged conditions
    #[must_use]
    pub fn into_status(
        self,
        previous: Option<&MultiClusterEngineStatus>,
        generation: Option<i64>,
        now: &str,
    ) -> MultiClusterEngineStatus {
        let conditions = [
            (CONDITION_AVAILABLE, self.health == Health::Available),
            (CONDITION_PROGRESSING, self.health == Health::Progressing),
            (CONDITION_DEGRADED, self.health == Health::Degraded),
        ]
        .into_iter()
        .map(|(kind, value)| {
            let status = if value { "True" } else { "False" };
            let last_transition_time = previous
                .and_then(|p| p.conditions.iter().find(|c| c.r#type == kind))
                .filter(|c| c.status == status)
                .and_then(|c| c.last_transition_time.clone())
                .unwrap_or_else(|| now.to_string());
            Condition {
                r#type: kind.to_string(),
                status: status.to_string(),
                last_transition_time: Some(last_transition_time),
                reason: Some(self.reason.clone()),
                message: Some(self.message.clone()),
            }
        })
        .collect();

        let components = self
            .components
            .unwrap_or_else(|| previous.map(|p| p.components.clone()).unwrap_or_default());

        MultiClusterEngineStatus {
            phase: Some(self.health.phase()),
            conditions,
            components,
            observed_generation: generation,
        }
    }
}

/// Summarize observed resources
///
/// Any failed resource degrades the engine; otherwise anything missing or
/// still rolling out keeps it progressing.
#[must_use]
pub fn aggregate(observed: &[ObservedResource]) -> AggregatedStatus {
    let mut components: Vec<ComponentStatus> = observed.iter().map(component_status).collect();
    components.sort();

    let failed: Vec<&str> = failing(observed, |s| matches!(s, ResourceState::Failed(_)));
    if !failed.is_empty() {
        return AggregatedStatus {
            health: Health::Degraded,
            reason: "ComponentFailed".to_string(),
            message: format!("Failed: {}", failed.join(", ")),
            components: Some(components),
        };
    }

    let pending: Vec<&str> = failing(observed, |s| {
        matches!(s, ResourceState::Missing | ResourceState::Progressing(_))
    });
    if !pending.is_empty() {
        return AggregatedStatus {
            health: Health::Progressing,
            reason: "ComponentsProgressing".to_string(),
            message: format!("Waiting for: {}", pending.join(", ")),
            components: Some(components),
        };
    }

    AggregatedStatus {
        health: Health::Available,
        reason: "ComponentsAvailable".to_string(),
        message: "All components are available".to_string(),
        components: Some(components),
    }
}

fn failing(observed: &[ObservedResource], pred: impl Fn(&ResourceState) -> bool) -> Vec<&str> {
    observed
        .iter()
        .filter(|o| pred(&o.state))
        .map(|o| o.name.as_str())
        .collect()
}

fn component_status(observed: &ObservedResource) -> ComponentStatus {
    let (status, reason, message) = match &observed.state {
        ResourceState::Ready => ("True", None, None),
        ResourceState::Missing => ("False", Some("Missing"), None),
        ResourceState::Progressing(m) => ("False", Some("Progressing"), Some(m.clone())),
        ResourceState::Failed(m) => ("False", Some("Failed"), Some(m.clone())),
    };
    ComponentStatus {
        name: observed.name.clone(),
        kind: observed.kind.kind().to_string(),
        status: status.to_string(),
        reason: reason.map(str::to_string),
        message,
    }
}
