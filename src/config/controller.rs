//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from the operator Deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace the operator runs in (image pin ConfigMaps are read from here)
    pub operator_namespace: String,
    /// Requeue interval after configuration, synthesis or other non-transient errors (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Requeue interval while owned resources are still progressing (seconds)
    pub progressing_requeue_secs: u64,
    /// Periodic resync interval once the engine is available (seconds)
    pub resync_interval_secs: u64,
    /// Deadline for a single reconcile pass (seconds)
    pub reconcile_timeout_secs: u64,
    /// Exponential backoff floor for transient API errors (seconds)
    pub backoff_min_secs: u64,
    /// Exponential backoff ceiling for transient API errors (seconds)
    pub backoff_max_secs: u64,
    /// Watch stream backoff starting value (milliseconds)
    pub watch_backoff_start_ms: u64,
    /// Watch stream backoff maximum value (milliseconds)
    pub watch_backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Maximum number of engines reconciled concurrently
    pub max_concurrent_reconciliations: u16,
    /// Debounce window for bursts of events on one key (milliseconds)
    pub debounce_ms: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            progressing_requeue_secs: DEFAULT_PROGRESSING_REQUEUE_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_backoff_start_ms: DEFAULT_WATCH_BACKOFF_START_MS,
            watch_backoff_max_ms: DEFAULT_WATCH_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            operator_namespace: env_var_or_default_str("POD_NAMESPACE", DEFAULT_OPERATOR_NAMESPACE),
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            progressing_requeue_secs: env_var_or_default(
                "PROGRESSING_REQUEUE_SECS",
                DEFAULT_PROGRESSING_REQUEUE_SECS,
            ),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            watch_backoff_start_ms: env_var_or_default(
                "WATCH_BACKOFF_START_MS",
                DEFAULT_WATCH_BACKOFF_START_MS,
            ),
            watch_backoff_max_ms: env_var_or_default(
                "WATCH_BACKOFF_MAX_MS",
                DEFAULT_WATCH_BACKOFF_MAX_MS,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            debounce_ms: env_var_or_default("DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        }
    }

    /// Get reconciliation error requeue duration
    #[must_use]
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get progressing requeue duration
    #[must_use]
    pub fn progressing_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.progressing_requeue_secs)
    }

    /// Get resync duration
    #[must_use]
    pub fn resync_interval_duration(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Get reconcile pass deadline
    #[must_use]
    pub fn reconcile_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    /// Get debounce duration
    #[must_use]
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_durations() {
        let config = ControllerConfig::default();
        assert_eq!(
            config.progressing_requeue_duration(),
            Duration::from_secs(crate::constants::DEFAULT_PROGRESSING_REQUEUE_SECS)
        );
        assert_eq!(config.debounce_duration(), Duration::from_millis(500));
        assert!(config.backoff_min_secs < config.backoff_max_secs);
    }

    #[test]
    fn test_env_var_or_default_falls_back_on_garbage() {
        // Unset variable names are unique to this test
        assert_eq!(env_var_or_default("BACKPLANE_TEST_UNSET_U64", 7u64), 7);
        assert_eq!(
            env_var_or_default_str("BACKPLANE_TEST_UNSET_STR", "fallback"),
            "fallback"
        );
    }
}
