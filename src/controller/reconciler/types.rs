//! # Types
//!
//! Core types for the reconciler.

use crate::config::SharedControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::images::{ImageDefaults, ImageError};
use crate::controller::reconciler::cluster::ClusterOps;
use crate::controller::render::SynthesisError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ImageError),
    #[error("Failed to render desired state: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Reconcile pass did not finish within {0:?}")]
    Timeout(Duration),
}

impl ReconcilerError {
    /// Whether retrying soon is likely to succeed
    ///
    /// Conflicts, throttling, server errors and transport failures are
    /// transient. Other API rejections, configuration and synthesis errors
    /// need an external change and are retried at the default interval.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcilerError::Kube(kube::Error::Api(api_err)) => {
                matches!(api_err.code, 409 | 429) || api_err.code >= 500
            }
            ReconcilerError::Kube(_) | ReconcilerError::Timeout(_) => true,
            ReconcilerError::Configuration(_) | ReconcilerError::Synthesis(_) => false,
        }
    }

    /// Condition reason recorded on the engine status
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Kube(_) => "ApplyFailed",
            ReconcilerError::Configuration(_) => "InvalidConfiguration",
            ReconcilerError::Synthesis(_) => "SynthesisFailed",
            ReconcilerError::Timeout(_) => "ReconcileTimeout",
        }
    }

    /// Short label used for metrics
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            ReconcilerError::Kube(_) => "kube",
            ReconcilerError::Configuration(_) => "configuration",
            ReconcilerError::Synthesis(_) => "synthesis",
            ReconcilerError::Timeout(_) => "timeout",
        }
    }
}

/// Backoff state for a specific engine
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            backoff: ExponentialBackoff::new(min_seconds, max_seconds),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared reconcile context
#[derive(Clone)]
pub struct Reconciler {
    /// Cluster access; a live client in production, in-memory in tests
    pub cluster: Arc<dyn ClusterOps>,
    /// Environment image defaults, validated at startup
    pub image_defaults: Arc<ImageDefaults>,
    pub controller_config: SharedControllerConfig,
    // Backoff state per engine name, owned by the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("image_defaults", &self.image_defaults)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterOps>,
        image_defaults: ImageDefaults,
        controller_config: SharedControllerConfig,
    ) -> Self {
        Self {
            cluster,
            image_defaults: Arc::new(image_defaults),
            controller_config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Forget accumulated backoff for an engine after a clean pass
    pub fn reset_backoff(&self, name: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(name) {
                state.reset();
            }
        }
    }
}
