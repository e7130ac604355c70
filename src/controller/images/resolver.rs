//! # Image Resolver
//!
//! Turns an [`ImageKey`] into the final pullable reference.
//!
//! Precedence, highest first:
//!
//! 1. ConfigMap pin for the key (`imageOverridesCM`)
//! 2. Repository substitution (`imageRepository`), keeping the default name and version
//! 3. Environment default `OPERAND_IMAGE_<KEY>`
//!
//! Environment defaults are validated once at startup, so resolution never fails.

use super::{ImageError, ImageKey, ImagePins};
use std::collections::BTreeMap;

/// Default reference for every known image key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefaults {
    images: BTreeMap<ImageKey, String>,
}

impl ImageDefaults {
    /// Load defaults from the process environment
    pub fn from_env() -> Result<Self, ImageError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load defaults through an arbitrary lookup, failing on the first missing key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ImageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut images = BTreeMap::new();
        for key in ImageKey::ALL {
            let var = key.env_var();
            let value = lookup(&var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ImageError::MissingDefault {
                    key: key.as_str(),
                    var: var.clone(),
                })?;
            images.insert(key, value);
        }
        Ok(Self { images })
    }

    /// Default reference for `key`
    #[must_use]
    pub fn get(&self, key: ImageKey) -> &str {
        // Construction guarantees every key is present
        self.images.get(&key).map_or("", String::as_str)
    }
}

/// Per-pass resolver over the three tiers
#[derive(Debug, Clone, Copy)]
pub struct ImageResolver<'a> {
    defaults: &'a ImageDefaults,
    repository: Option<&'a str>,
    pins: &'a ImagePins,
}

impl<'a> ImageResolver<'a> {
    #[must_use]
    pub fn new(defaults: &'a ImageDefaults, repository: Option<&'a str>, pins: &'a ImagePins) -> Self {
        Self {
            defaults,
            repository: repository.filter(|r| !r.is_empty()),
            pins,
        }
    }

    /// Final image reference for `key`
    #[must_use]
    pub fn resolve(&self, key: ImageKey) -> String {
        if let Some(pin) = self.pins.get(key) {
            return pin.reference();
        }
        let default = self.defaults.get(key);
        match self.repository {
            Some(repository) => substitute_repository(repository, default),
            None => default.to_string(),
        }
    }
}

/// Swap the repository of `image`, keeping its last path segment (name plus tag or digest)
fn substitute_repository(repository: &str, image: &str) -> String {
    let name = image.rsplit_once('/').map_or(image, |(_, name)| name);
    format!("{}/{name}", repository.trim_end_matches('/'))
}
