//! Backplane Operator Library
//!
//! Reconciles a cluster-scoped `MultiClusterEngine` resource into the
//! multicluster engine backplane: its namespace, operand Deployments,
//! supporting resources and the status that reports their readiness.
//!
//! ## Quick Start
//!
//! ```rust
//! use backplane_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
