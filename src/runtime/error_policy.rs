//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
    FIELD_MANAGER,
};
use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::MultiClusterEngine;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use kube_runtime::watcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Decide when to retry a failed reconcile
///
/// Transient errors back off exponentially per engine; the backoff is reset
/// by the next successful pass. Everything else waits for the default error
/// requeue interval, since only an external change can fix it.
pub fn handle_reconciliation_error(
    obj: Arc<MultiClusterEngine>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", name, error);
    observability::metrics::increment_reconciliation_errors(error.metric_label());

    // The error policy is synchronous; fall back to defaults if the config is being written
    let (backoff_min, backoff_max, default_requeue) = match ctx.controller_config.try_read() {
        Ok(config) => (
            config.backoff_min_secs,
            config.backoff_max_secs,
            config.reconciliation_error_requeue_secs,
        ),
        Err(_) => (
            DEFAULT_BACKOFF_MIN_SECS,
            DEFAULT_BACKOFF_MAX_SECS,
            DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
        ),
    };

    if !error.is_transient() {
        info!(
            "Non-transient error ({}), retrying in {}s",
            error.reason(),
            default_requeue
        );
        observability::metrics::increment_requeues_total("error-default");
        return Action::requeue(Duration::from_secs(default_requeue));
    }

    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(name.clone())
                .or_insert_with(|| BackoffState::new(backoff_min, backoff_max));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default requeue", e);
            (default_requeue, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "🔄 Retrying with exponential backoff: {}s (error count: {})",
        backoff_seconds, error_count
    );
    info!(
        "📅 Next retry scheduled: {} (in {}s)",
        next_trigger_time.to_rfc3339(),
        backoff_seconds
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Classification of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify by the API status the watcher received, if any
    #[must_use]
    pub fn classify(error: &watcher::Error) -> Self {
        let code = match error {
            watcher::Error::WatchError(response) => Some(response.code),
            watcher::Error::InitialListFailed(e)
            | watcher::Error::WatchStartFailed(e)
            | watcher::Error::WatchFailed(e) => api_status_code(e),
            _ => None,
        };
        Self::from_status_code(code)
    }

    #[must_use]
    pub fn from_status_code(code: Option<u16>) -> Self {
        match code {
            Some(401 | 403) => WatchErrorKind::Unauthorized,
            Some(404) => WatchErrorKind::NotFound,
            Some(410) => WatchErrorKind::Expired,
            Some(429) => WatchErrorKind::Throttled,
            _ => WatchErrorKind::Other,
        }
    }
}

fn api_status_code(error: &kube::Error) -> Option<u16> {
    match error {
        kube::Error::Api(response) => Some(response.code),
        _ => None,
    }
}

/// Handle a watcher failure with classification and backoff
///
/// Only queue (watcher) errors come through here; reconcile failures are
/// retried by the error policy. Returns `None` to filter out the error
/// (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error: &watcher::Error,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error
    );
    let _error_guard = error_span.enter();

    match WatchErrorKind::classify(error) {
        WatchErrorKind::Unauthorized => {
            error!(
                "❌ Watch authentication failed (401/403) - RBAC may have been revoked or token expired"
            );
            error!("🔍 SRE Diagnostics:");
            error!("   1. Verify the ClusterRole and ClusterRoleBinding still exist:");
            error!("      kubectl get clusterrole,clusterrolebinding {FIELD_MANAGER}");
            error!("   2. Verify RBAC permissions are still active:");
            error!(
                "      kubectl auth can-i watch multiclusterengines --as=system:serviceaccount:<namespace>:{FIELD_MANAGER}"
            );
            error!("   3. If RBAC was recently changed, restart the operator pod");
            warn!(
                "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay_secs
            );
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!(
                error_type = "410",
                "Watch resource version expired (410) - watch will restart"
            );
            None
        }
        WatchErrorKind::Throttled => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server throttling (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
            None
        }
        WatchErrorKind::NotFound => {
            // A managed kind whose CRD was removed after startup
            warn!("Watched API not found (404): {}", error);
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error);
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
    }
}
