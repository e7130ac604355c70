//! # Runtime
//!
//! Operator start-up and the long-running watch loop.
//!
//! - `initialization`: process setup and dependency discovery
//! - `error_policy`: retry decisions for failed reconciles and watch errors
//! - `watch_loop`: the kube-runtime controller and its restart loop

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;
