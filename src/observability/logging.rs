//! # Logging
//!
//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence; otherwise the filter is built from the
//! configured log level. `LOG_FORMAT=json` switches to JSON lines.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter for `log_level` unless `RUST_LOG` is set
#[must_use]
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("backplane_operator={log_level},kube=warn")))
}

/// Install the global tracing subscriber
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(log_level));
    let result = if log_format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.with_target(true).try_init()
    };
    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
