//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager used for every server-side apply issued by the operator
pub const FIELD_MANAGER: &str = "backplane-operator";

/// Default namespace for operand workloads when `spec.targetNamespace` is empty
pub const DEFAULT_TARGET_NAMESPACE: &str = "multicluster-engine";

/// Namespace the operator runs in when `POD_NAMESPACE` is unset
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "backplane-operator-system";

/// Namespace that hosts cluster monitoring objects (ServiceMonitors)
pub const MONITORING_NAMESPACE: &str = "openshift-monitoring";

/// Annotation on the MultiClusterEngine that substitutes the image repository
pub const ANNOTATION_IMAGE_REPOSITORY: &str = "imageRepository";

/// Annotation on the MultiClusterEngine naming the image pin ConfigMap
pub const ANNOTATION_IMAGE_OVERRIDES_CM: &str = "imageOverridesCM";

/// Data key in the image pin ConfigMap holding the JSON array of entries
pub const IMAGE_OVERRIDES_DATA_KEY: &str = "overrides.json";

/// Prefix of the per-image-key environment defaults
pub const OPERAND_IMAGE_ENV_PREFIX: &str = "OPERAND_IMAGE_";

/// Label carried by every managed resource, naming the owning engine
pub const LABEL_BACKPLANE_NAME: &str = "backplaneconfig.name";

/// Label carried by every managed resource, naming the installer
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Label carried by every managed resource, naming the component it belongs to
pub const LABEL_COMPONENT: &str = "installer.component";

/// Value of [`LABEL_MANAGED_BY`]
pub const MANAGED_BY_VALUE: &str = "backplane-operator";

/// Component label value for the always-on resources
pub const CORE_COMPONENT: &str = "core";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default requeue interval for non-transient reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default requeue interval while owned resources are still rolling out (seconds)
pub const DEFAULT_PROGRESSING_REQUEUE_SECS: u64 = 10;

/// Default resync interval once everything is available (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default deadline for a single reconcile pass (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Default minimum backoff for transient errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 2;

/// Default maximum backoff for transient errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default watch stream backoff starting value (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_START_MS: u64 = 1000;

/// Default watch stream backoff maximum value (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default number of engines reconciled concurrently
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 4;

/// Default debounce window applied to bursts of events for one key (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
