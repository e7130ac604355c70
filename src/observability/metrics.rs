//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `backplane_reconciliations_total` - Total number of reconcile passes
//! - `backplane_reconciliation_errors_total` - Reconcile errors by error type
//! - `backplane_reconciliation_duration_seconds` - Duration of reconcile passes
//! - `backplane_requeues_total` - Requeues by reason
//! - `backplane_resources_applied_total` - Server-side applies by kind
//! - `backplane_apply_duration_seconds` - Duration of server-side applies by kind
//! - `backplane_apply_errors_total` - Failed server-side applies by kind
//! - `backplane_resources_removed_total` - Resources of disabled components deleted, by kind
//! - `backplane_component_overrides_deduplicated_total` - Override lists rewritten after dedup
//! - `backplane_engine_available` - 1 when an engine's last pass reported Available

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "backplane_reconciliations_total",
        "Total number of reconcile passes",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "backplane_reconciliation_errors_total",
            "Total number of reconcile errors by error type",
        ),
        &["error_type"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "backplane_reconciliation_duration_seconds",
            "Duration of reconcile passes in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 120.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("backplane_requeues_total", "Total number of requeues by reason"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static RESOURCES_APPLIED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "backplane_resources_applied_total",
            "Total number of server-side applies by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RESOURCES_APPLIED_TOTAL metric - this should never happen")
});

static APPLY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "backplane_apply_duration_seconds",
            "Duration of server-side applies in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["kind"],
    )
    .expect("Failed to create APPLY_DURATION metric - this should never happen")
});

static APPLY_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "backplane_apply_errors_total",
            "Total number of failed server-side applies by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create APPLY_ERRORS_TOTAL metric - this should never happen")
});

static RESOURCES_REMOVED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "backplane_resources_removed_total",
            "Total number of resources of disabled components deleted, by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RESOURCES_REMOVED_TOTAL metric - this should never happen")
});

static OVERRIDES_DEDUPLICATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "backplane_component_overrides_deduplicated_total",
        "Total number of component override lists rewritten after deduplication",
    )
    .expect("Failed to create OVERRIDES_DEDUPLICATED_TOTAL metric - this should never happen")
});

static ENGINE_AVAILABLE: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "backplane_engine_available",
            "1 when the last pass of an engine reported Available",
        ),
        &["engine"],
    )
    .expect("Failed to create ENGINE_AVAILABLE metric - this should never happen")
});

/// Register every metric with [`REGISTRY`]
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<()> {
    register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_DURATION.clone()))?;
    register(Box::new(REQUEUES_TOTAL.clone()))?;
    register(Box::new(RESOURCES_APPLIED_TOTAL.clone()))?;
    register(Box::new(APPLY_DURATION.clone()))?;
    register(Box::new(APPLY_ERRORS_TOTAL.clone()))?;
    register(Box::new(RESOURCES_REMOVED_TOTAL.clone()))?;
    register(Box::new(OVERRIDES_DEDUPLICATED_TOTAL.clone()))?;
    register(Box::new(ENGINE_AVAILABLE.clone()))?;

    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(error_type: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[error_type])
        .inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a successful server-side apply
pub fn record_apply(kind: &str, duration: f64) {
    RESOURCES_APPLIED_TOTAL.with_label_values(&[kind]).inc();
    APPLY_DURATION.with_label_values(&[kind]).observe(duration);
}

pub fn increment_apply_errors(kind: &str) {
    APPLY_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_resources_removed(kind: &str) {
    RESOURCES_REMOVED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_overrides_deduplicated() {
    OVERRIDES_DEDUPLICATED_TOTAL.inc();
}

pub fn set_engine_available(engine: &str, available: bool) {
    ENGINE_AVAILABLE
        .with_label_values(&[engine])
        .set(i64::from(available));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        assert!(register_metrics().is_ok());
        // Second registration is tolerated
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        let after = RECONCILIATIONS_TOTAL.get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["kube"])
            .get();
        increment_reconciliation_errors("kube");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["kube"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration(1.5);
    }

    #[test]
    fn test_increment_requeues_total() {
        let before = REQUEUES_TOTAL.with_label_values(&["progressing"]).get();
        increment_requeues_total("progressing");
        let after = REQUEUES_TOTAL.with_label_values(&["progressing"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_apply() {
        let before = RESOURCES_APPLIED_TOTAL
            .with_label_values(&["Deployment"])
            .get();
        record_apply("Deployment", 0.02);
        let after = RESOURCES_APPLIED_TOTAL
            .with_label_values(&["Deployment"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_apply_errors() {
        let before = APPLY_ERRORS_TOTAL.with_label_values(&["HiveConfig"]).get();
        increment_apply_errors("HiveConfig");
        let after = APPLY_ERRORS_TOTAL.with_label_values(&["HiveConfig"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_resources_removed() {
        let before = RESOURCES_REMOVED_TOTAL
            .with_label_values(&["ServiceAccount"])
            .get();
        increment_resources_removed("ServiceAccount");
        let after = RESOURCES_REMOVED_TOTAL
            .with_label_values(&["ServiceAccount"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_overrides_deduplicated() {
        let before = OVERRIDES_DEDUPLICATED_TOTAL.get();
        increment_overrides_deduplicated();
        assert_eq!(OVERRIDES_DEDUPLICATED_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_set_engine_available() {
        set_engine_available("metrics-test", true);
        assert_eq!(ENGINE_AVAILABLE.with_label_values(&["metrics-test"]).get(), 1);
        set_engine_available("metrics-test", false);
        assert_eq!(ENGINE_AVAILABLE.with_label_values(&["metrics-test"]).get(), 0);
    }
}
