//! Feature descriptor (`devcontainer-feature.json`)
//!
//! Only the fields the harness needs are modelled; everything else in the
//! descriptor is ignored.

use crate::errors::ConfigError;
use crate::json;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument};

/// Identifier used when the descriptor has no `id`
pub const DEFAULT_FEATURE_ID: &str = "feature";

/// Metadata of the feature under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    /// Feature identifier; a missing or `null` id falls back to the default
    #[serde(default = "default_id", deserialize_with = "deserialize_id")]
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Feature version
    #[serde(default)]
    pub version: Option<String>,

    /// Features that must be installed before this one, in declared order.
    /// A value that is not an array is ignored; non-string entries are skipped.
    #[serde(default, deserialize_with = "deserialize_installs_after")]
    pub installs_after: Vec<String>,
}

fn default_id() -> String {
    DEFAULT_FEATURE_ID.to_string()
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_id))
}

fn deserialize_installs_after<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

impl Default for FeatureDescriptor {
    fn default() -> Self {
        Self {
            id: default_id(),
            name: None,
            version: None,
            installs_after: Vec::new(),
        }
    }
}

impl FeatureDescriptor {
    /// Display name, falling back to the given default
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }

    /// Version, falling back to `1.0.0`
    pub fn version_or_default(&self) -> &str {
        self.version.as_deref().unwrap_or("1.0.0")
    }

    fn normalize(mut self) -> Self {
        let trimmed = self.id.trim();
        self.id = if trimmed.is_empty() {
            default_id()
        } else {
            trimmed.to_string()
        };
        self
    }
}

/// Parse a feature descriptor from `path`
#[instrument(level = "debug")]
pub fn load_feature_descriptor(path: &Path) -> Result<FeatureDescriptor, ConfigError> {
    let descriptor: FeatureDescriptor = json::load_file(path)?;
    let descriptor = descriptor.normalize();
    debug!(
        "Parsed feature descriptor: id={}, installs_after={:?}",
        descriptor.id, descriptor.installs_after
    );
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_descriptor(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devcontainer-feature.json");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_full_descriptor() {
        let (_dir, path) = write_descriptor(
            r#"{
                "id": "init",
                "name": "Init",
                "version": "2.3.0",
                "installsAfter": ["ghcr.io/devcontainers/features/common-utils", "ghcr.io/x/y:1"],
                "options": {"flag": {"type": "boolean", "default": false}}
            }"#,
        );
        let descriptor = load_feature_descriptor(&path).unwrap();
        assert_eq!(descriptor.id, "init");
        assert_eq!(descriptor.name_or("x"), "Init");
        assert_eq!(descriptor.version_or_default(), "2.3.0");
        assert_eq!(
            descriptor.installs_after,
            vec!["ghcr.io/devcontainers/features/common-utils", "ghcr.io/x/y:1"]
        );
    }

    #[test]
    fn test_missing_id_defaults() {
        let (_dir, path) = write_descriptor(r#"{"name": "nameless"}"#);
        let descriptor = load_feature_descriptor(&path).unwrap();
        assert_eq!(descriptor.id, DEFAULT_FEATURE_ID);
        assert!(descriptor.installs_after.is_empty());
        assert_eq!(descriptor.version_or_default(), "1.0.0");
    }

    #[test]
    fn test_blank_id_defaults() {
        let (_dir, path) = write_descriptor(r#"{"id": "  "}"#);
        assert_eq!(load_feature_descriptor(&path).unwrap().id, DEFAULT_FEATURE_ID);
    }

    #[test]
    fn test_null_id_defaults() {
        let (_dir, path) = write_descriptor(r#"{"id": null, "installsAfter": null}"#);
        let descriptor = load_feature_descriptor(&path).unwrap();
        assert_eq!(descriptor.id, DEFAULT_FEATURE_ID);
        assert!(descriptor.installs_after.is_empty());
    }

    #[test]
    fn test_non_array_installs_after_ignored() {
        let (_dir, path) = write_descriptor(r#"{"id": "f", "installsAfter": "ghcr.io/x/y:1"}"#);
        assert!(load_feature_descriptor(&path)
            .unwrap()
            .installs_after
            .is_empty());

        let (_dir, path) = write_descriptor(r#"{"id": "f", "installsAfter": ["a", 3, null, "b"]}"#);
        assert_eq!(
            load_feature_descriptor(&path).unwrap().installs_after,
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let (_dir, path) = write_descriptor("{ id: ");
        assert!(matches!(
            load_feature_descriptor(&path),
            Err(ConfigError::Parsing { .. })
        ));
    }
}
