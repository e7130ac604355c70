//! # Configuration
//!
//! Operator configuration loaded from environment variables.
//!
//! Both configurations are shared behind `Arc<RwLock<_>>` so the watch loop and
//! the error policy always read the same values.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared controller configuration
pub type SharedControllerConfig = Arc<RwLock<ControllerConfig>>;

/// Shared server configuration
pub type SharedServerConfig = Arc<RwLock<ServerConfig>>;

/// Load both configurations from the environment and wrap them for sharing
#[must_use]
pub fn create_shared_config() -> (SharedControllerConfig, SharedServerConfig) {
    (
        Arc::new(RwLock::new(ControllerConfig::from_env())),
        Arc::new(RwLock::new(ServerConfig::from_env())),
    )
}
