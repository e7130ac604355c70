//! # Image Resolution
//!
//! Layered resolution of operand image references.
//!
//! - `keys.rs` - Logical image keys and their environment variables
//! - `pins.rs` - Image pin ConfigMap format
//! - `resolver.rs` - Environment defaults and the three-tier resolver

mod keys;
mod pins;
mod resolver;

pub use keys::ImageKey;
pub use pins::{ImageOverrideEntry, ImagePins};
pub use resolver::{ImageDefaults, ImageResolver};

use thiserror::Error;

/// Image configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("no default image for key {key}: environment variable {var} is unset")]
    MissingDefault { key: &'static str, var: String },
    #[error("image overrides in {source_name} are malformed: {reason}")]
    MalformedOverrides { source_name: String, reason: String },
}
