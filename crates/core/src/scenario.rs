//! Scenario catalog (`test/scenarios.json`)
//!
//! The catalog maps a scenario name to the base image and the features to
//! install. Iteration follows the insertion order of the source file.

use crate::errors::ConfigError;
use crate::json;
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, instrument};

/// One test scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Base image of the generated container
    pub image: String,

    /// Feature id → options declared by the scenario; `null` means none
    #[serde(default, deserialize_with = "deserialize_features")]
    pub features: IndexMap<String, Value>,
}

fn deserialize_features<'de, D>(deserializer: D) -> Result<IndexMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Scenario {
    /// Options the scenario declares for `feature_id`.
    ///
    /// `None` when the scenario does not mention the feature or sets it to
    /// `null`.
    pub fn options_for(&self, feature_id: &str) -> Option<&Value> {
        self.features.get(feature_id).filter(|v| !v.is_null())
    }

    /// Object-shaped options for `feature_id`; non-object values yield `None`
    pub fn option_map_for(&self, feature_id: &str) -> Option<&Map<String, Value>> {
        self.options_for(feature_id).and_then(Value::as_object)
    }
}

/// Ordered mapping of scenario name to definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioCatalog {
    scenarios: IndexMap<String, Scenario>,
}

impl ScenarioCatalog {
    /// Build a catalog from already-parsed entries
    pub fn new(scenarios: IndexMap<String, Scenario>) -> Self {
        Self { scenarios }
    }

    /// Number of scenarios
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog has no scenarios
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Scenario names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scenario)> {
        self.scenarios.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve the scenarios to run.
    ///
    /// With no explicit name every scenario is selected in catalog order; an
    /// explicit name selects exactly that scenario or fails with
    /// [`ConfigError::UnknownScenario`].
    pub fn select(&self, name: Option<&str>) -> Result<Vec<(&str, &Scenario)>, ConfigError> {
        match name {
            None => Ok(self.iter().collect()),
            Some(name) => match self.scenarios.get_key_value(name) {
                Some((key, scenario)) => Ok(vec![(key.as_str(), scenario)]),
                None => Err(ConfigError::UnknownScenario {
                    name: name.to_string(),
                    available: self.names().map(str::to_string).collect(),
                }),
            },
        }
    }
}

/// Parse a scenario catalog from `path`
#[instrument(level = "debug")]
pub fn load_scenario_catalog(path: &Path) -> Result<ScenarioCatalog, ConfigError> {
    let catalog: ScenarioCatalog = json::load_file(path)?;
    debug!(
        "Loaded {} scenario(s): {:?}",
        catalog.len(),
        catalog.names().collect::<Vec<_>>()
    );
    Ok(catalog)
}
