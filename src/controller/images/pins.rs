//! # Image Pins
//!
//! Parses the image pin ConfigMap referenced by the `imageOverridesCM`
//! annotation. The ConfigMap holds a JSON array under `overrides.json`:
//!
//! ```json
//! [
//!   {
//!     "image-key": "discovery_operator",
//!     "image-remote": "quay.io/stolostron",
//!     "image-name": "discovery-operator",
//!     "image-digest": "sha256:9dc4d072..."
//!   }
//! ]
//! ```

use super::{ImageError, ImageKey};
use crate::constants::IMAGE_OVERRIDES_DATA_KEY;
use k8s_openapi::api::core::v1::ConfigMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pinned image
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageOverrideEntry {
    pub image_key: String,
    pub image_remote: String,
    pub image_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}

impl ImageOverrideEntry {
    /// Full reference: digest form when a digest is set, tag form otherwise
    #[must_use]
    pub fn reference(&self) -> String {
        let remote = self.image_remote.trim_end_matches('/');
        match (
            non_empty(self.image_digest.as_deref()),
            non_empty(self.image_tag.as_deref()),
        ) {
            (Some(digest), _) => format!("{remote}/{}@{digest}", self.image_name),
            (None, Some(tag)) => format!("{remote}/{}:{tag}", self.image_name),
            (None, None) => format!("{remote}/{}", self.image_name),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Pinned images for one reconcile pass, keyed by `image-key`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePins {
    entries: BTreeMap<String, ImageOverrideEntry>,
}

impl ImagePins {
    /// No pins; every key falls through to the lower tiers
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON array of entries. A later entry for the same key replaces an earlier one.
    pub fn from_json(source: &str, raw: &str) -> Result<Self, ImageError> {
        let parsed: Vec<ImageOverrideEntry> =
            serde_json::from_str(raw).map_err(|e| ImageError::MalformedOverrides {
                source_name: source.to_string(),
                reason: e.to_string(),
            })?;
        let entries = parsed
            .into_iter()
            .map(|entry| (entry.image_key.clone(), entry))
            .collect();
        Ok(Self { entries })
    }

    /// Read pins from the `overrides.json` key of a ConfigMap
    ///
    /// A ConfigMap without that key yields no pins.
    pub fn from_config_map(config_map: &ConfigMap) -> Result<Self, ImageError> {
        let name = config_map.metadata.name.as_deref().unwrap_or("unknown");
        match config_map
            .data
            .as_ref()
            .and_then(|d| d.get(IMAGE_OVERRIDES_DATA_KEY))
        {
            Some(raw) => Self::from_json(name, raw),
            None => Ok(Self::empty()),
        }
    }

    #[must_use]
    pub fn get(&self, key: ImageKey) -> Option<&ImageOverrideEntry> {
        self.entries.get(key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
