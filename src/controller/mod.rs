//! # Controller
//!
//! Core controller modules for the backplane operator.
//!
//! - `backoff`: Exponential backoff for retries
//! - `images`: Operand image resolution
//! - `overrides`: Component override deduplication and effective configuration
//! - `reconciler`: Core reconciliation logic
//! - `render`: Desired-state synthesis
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod images;
pub mod overrides;
pub mod reconciler;
pub mod render;
pub mod server;
